//! End-to-end behaviour of the configuration store on a real filesystem.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use fieldkit_core::{ConfigKey, ConfigStore, CoordinateFormat, Locale, StoreOptions};
use serde_json::{json, Value};

fn compact() -> StoreOptions {
    StoreOptions {
        pretty: false,
        ..StoreOptions::default()
    }
}

fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

fn read_document(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn first_start_persists_explicit_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let store = ConfigStore::open_at(&path, compact(), utc(2024, 1, 15)).unwrap();

    let id = store.telemetry_identity().id;
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    let expected = format!(
        concat!(
            r#"{{"version":1,"state":{{"coordinateFormat":"utm","diagnosticsEnabled":true,"#,
            r#""locale":{{"useSystemPreferences":true,"languageTag":null}},"#,
            r#""telemetryIdentity":{{"id":"{id}","monthTag":"2024-0"}}}}}}"#
        ),
        id = id
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), expected);
}

#[test]
fn setting_one_key_leaves_others_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let store = Arc::new(ConfigStore::open_at(&path, compact(), utc(2024, 1, 15)).unwrap());

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || (0..200).all(|_| store.diagnostics_enabled()))
    };
    store.set(ConfigKey::CoordinateFormat, json!("dd")).unwrap();

    assert!(reader.join().unwrap());
    assert_eq!(read_document(&path)["state"]["coordinateFormat"], json!("dd"));
    assert!(store.diagnostics_enabled());
}

#[test]
fn consecutive_loads_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"version":1,"state":{}}"#).unwrap();

    ConfigStore::open_at(&path, compact(), utc(2024, 3, 1)).unwrap();
    let first = fs::read(&path).unwrap();
    ConfigStore::open_at(&path, compact(), utc(2024, 3, 20)).unwrap();
    let second = fs::read(&path).unwrap();

    assert_eq!(first, second);
}

#[test]
fn empty_state_yields_schema_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"version":1,"state":{}}"#).unwrap();

    let store = ConfigStore::open_at(&path, compact(), utc(2024, 1, 15)).unwrap();

    assert_eq!(store.coordinate_format(), CoordinateFormat::Utm);
    assert!(store.diagnostics_enabled());
    assert_eq!(store.locale(), Locale::System);
    assert_eq!(
        store.get(ConfigKey::Locale),
        Some(json!({ "useSystemPreferences": true, "languageTag": null }))
    );
}

#[test]
fn every_permitted_value_round_trips_through_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let now = utc(2024, 5, 5);

    let cases = [
        (ConfigKey::ActiveProjectId, json!("7f3a-field-survey")),
        (ConfigKey::CoordinateFormat, json!("dd")),
        (ConfigKey::CoordinateFormat, json!("dms")),
        (ConfigKey::CoordinateFormat, json!("utm")),
        (ConfigKey::DiagnosticsEnabled, json!(false)),
        (ConfigKey::DiagnosticsEnabled, json!(true)),
        (
            ConfigKey::Locale,
            json!({ "useSystemPreferences": false, "languageTag": "es" }),
        ),
        (
            ConfigKey::Locale,
            json!({ "useSystemPreferences": true, "languageTag": null }),
        ),
    ];

    for (key, value) in cases {
        let store = ConfigStore::open_at(&path, compact(), now).unwrap();
        store.set(key, value.clone()).unwrap();

        let reloaded = ConfigStore::open_at(&path, compact(), now).unwrap();
        assert_eq!(reloaded.get(key), Some(value), "{key} did not round-trip");
    }
}

#[test]
fn identity_rotates_only_when_the_utc_month_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let original_id = "0123456789abcdef0123456789abcdef";
    fs::write(
        &path,
        format!(r#"{{"version":1,"state":{{"telemetryIdentity":{{"id":"{original_id}","monthTag":"2024-0"}}}}}}"#),
    )
    .unwrap();

    let same_month = ConfigStore::open_at(&path, compact(), utc(2024, 1, 31)).unwrap();
    assert_eq!(same_month.telemetry_identity().id, original_id);

    let next_month = ConfigStore::open_at(&path, compact(), utc(2024, 2, 1)).unwrap();
    let rotated = next_month.telemetry_identity();
    assert_ne!(rotated.id, original_id);
    assert_eq!(rotated.month_tag, "2024-1");
    assert_eq!(
        read_document(&path)["state"]["telemetryIdentity"]["id"],
        json!(rotated.id)
    );
}

#[test]
fn deleted_optional_key_is_absent_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let store = ConfigStore::open_at(&path, compact(), utc(2024, 1, 15)).unwrap();
    store.set_active_project_id("project-1").unwrap();

    store.delete(ConfigKey::ActiveProjectId).unwrap();
    let reloaded = ConfigStore::open_at(&path, compact(), utc(2024, 1, 15)).unwrap();

    assert_eq!(reloaded.active_project_id(), None);
    let raw = fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("activeProjectId"));
}

fn cross_device(_from: &Path, _to: &Path) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::CrossesDevices))
}

#[test]
fn cross_device_rename_still_writes_new_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    ConfigStore::open_at(&path, compact(), utc(2024, 1, 15)).unwrap();

    let options = StoreOptions {
        pretty: false,
        rename: cross_device,
    };
    let store = ConfigStore::open_at(&path, options, utc(2024, 1, 15)).unwrap();
    store.set_coordinate_format(CoordinateFormat::Dms).unwrap();

    assert_eq!(read_document(&path)["state"]["coordinateFormat"], json!("dms"));
    let leftovers = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn unknown_setting_names_are_rejected() {
    assert!("mapStyle".parse::<ConfigKey>().is_err());
}
