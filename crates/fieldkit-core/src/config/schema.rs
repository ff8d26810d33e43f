//! Statically typed schema of the configuration record.
//!
//! Closed unions (`coordinateFormat`, `locale`) reject anything outside
//! their variants. Missing fields take their defaults; fields that are
//! present but invalid fail deserialization as a whole.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::telemetry::{self, TelemetryIdentity};

/// Minimum length of an explicit language tag.
pub const MIN_LANGUAGE_TAG_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateFormat {
    /// Decimal degrees
    Dd,
    /// Degrees, minutes, seconds
    Dms,
    #[default]
    Utm,
}

/// UI locale preference.
///
/// On disk: `{"useSystemPreferences":true,"languageTag":null}` or
/// `{"useSystemPreferences":false,"languageTag":"<tag>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "LocaleRepr", into = "LocaleRepr")]
pub enum Locale {
    #[default]
    System,
    Explicit(String),
}

impl Locale {
    pub fn explicit(tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        Self::try_from(LocaleRepr {
            use_system_preferences: false,
            language_tag: Some(tag),
        })
        .map_err(|reason| Error::InvalidSetting {
            key: ConfigKey::Locale.to_string(),
            reason,
        })
    }

    pub fn language_tag(&self) -> Option<&str> {
        match self {
            Locale::System => None,
            Locale::Explicit(tag) => Some(tag),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocaleRepr {
    use_system_preferences: bool,
    #[serde(default)]
    language_tag: Option<String>,
}

impl TryFrom<LocaleRepr> for Locale {
    type Error = String;

    fn try_from(repr: LocaleRepr) -> std::result::Result<Self, Self::Error> {
        match (repr.use_system_preferences, repr.language_tag) {
            (true, None) => Ok(Locale::System),
            (true, Some(_)) => {
                Err("languageTag must be null when useSystemPreferences is true".to_string())
            }
            (false, Some(tag)) if tag.chars().count() >= MIN_LANGUAGE_TAG_LEN => {
                Ok(Locale::Explicit(tag))
            }
            (false, Some(tag)) => Err(format!(
                "languageTag '{tag}' is shorter than {MIN_LANGUAGE_TAG_LEN} characters"
            )),
            (false, None) => {
                Err("languageTag is required when useSystemPreferences is false".to_string())
            }
        }
    }
}

impl From<Locale> for LocaleRepr {
    fn from(locale: Locale) -> Self {
        match locale {
            Locale::System => LocaleRepr {
                use_system_preferences: true,
                language_tag: None,
            },
            Locale::Explicit(tag) => LocaleRepr {
                use_system_preferences: false,
                language_tag: Some(tag),
            },
        }
    }
}

/// The durable settings record. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_project_id: Option<String>,
    pub coordinate_format: CoordinateFormat,
    pub diagnostics_enabled: bool,
    pub locale: Locale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_key: Option<String>,
    pub telemetry_identity: TelemetryIdentity,
}

impl ConfigurationRecord {
    /// Full schema defaults with a freshly minted telemetry identity.
    pub fn defaults(now: DateTime<Utc>) -> Self {
        StoredState::default().into_record(now).0
    }
}

/// What windows may see of the record. The root key never leaves the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_project_id: Option<String>,
    pub coordinate_format: CoordinateFormat,
    pub diagnostics_enabled: bool,
    pub locale: Locale,
    pub telemetry_identity: TelemetryIdentity,
}

impl From<&ConfigurationRecord> for PublicSettings {
    fn from(record: &ConfigurationRecord) -> Self {
        Self {
            active_project_id: record.active_project_id.clone(),
            coordinate_format: record.coordinate_format,
            diagnostics_enabled: record.diagnostics_enabled,
            locale: record.locale.clone(),
            telemetry_identity: record.telemetry_identity.clone(),
        }
    }
}

/// Deserialization view of `state`, with defaults for missing fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredState {
    #[serde(default, deserialize_with = "present")]
    active_project_id: Option<String>,
    #[serde(default)]
    coordinate_format: CoordinateFormat,
    #[serde(default = "default_diagnostics_enabled")]
    diagnostics_enabled: bool,
    #[serde(default)]
    locale: Locale,
    #[serde(default, deserialize_with = "present")]
    root_key: Option<String>,
    #[serde(default, deserialize_with = "present")]
    telemetry_identity: Option<TelemetryIdentity>,
}

impl Default for StoredState {
    fn default() -> Self {
        Self {
            active_project_id: None,
            coordinate_format: CoordinateFormat::default(),
            diagnostics_enabled: default_diagnostics_enabled(),
            locale: Locale::default(),
            root_key: None,
            telemetry_identity: None,
        }
    }
}

impl StoredState {
    /// Build the record, rotating the telemetry identity for `now`. The flag
    /// reports whether the identity was (re)generated.
    pub(crate) fn into_record(self, now: DateTime<Utc>) -> (ConfigurationRecord, bool) {
        let (telemetry_identity, rotated) = telemetry::rotate(self.telemetry_identity, now);
        let record = ConfigurationRecord {
            active_project_id: self.active_project_id,
            coordinate_format: self.coordinate_format,
            diagnostics_enabled: self.diagnostics_enabled,
            locale: self.locale,
            root_key: self.root_key,
            telemetry_identity,
        };
        (record, rotated)
    }
}

fn default_diagnostics_enabled() -> bool {
    true
}

// Optional fields are either absent or hold a value; explicit null is invalid.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Addressable fields of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ActiveProjectId,
    CoordinateFormat,
    DiagnosticsEnabled,
    Locale,
    RootKey,
    TelemetryIdentity,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::ActiveProjectId,
        ConfigKey::CoordinateFormat,
        ConfigKey::DiagnosticsEnabled,
        ConfigKey::Locale,
        ConfigKey::RootKey,
        ConfigKey::TelemetryIdentity,
    ];

    /// Keys windows may read and write through the settings commands.
    pub const SETTINGS: [ConfigKey; 4] = [
        ConfigKey::ActiveProjectId,
        ConfigKey::CoordinateFormat,
        ConfigKey::DiagnosticsEnabled,
        ConfigKey::Locale,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::ActiveProjectId => "activeProjectId",
            ConfigKey::CoordinateFormat => "coordinateFormat",
            ConfigKey::DiagnosticsEnabled => "diagnosticsEnabled",
            ConfigKey::Locale => "locale",
            ConfigKey::RootKey => "rootKey",
            ConfigKey::TelemetryIdentity => "telemetryIdentity",
        }
    }

    /// Optional keys may be absent from the serialized state.
    pub fn is_optional(self) -> bool {
        matches!(self, ConfigKey::ActiveProjectId | ConfigKey::RootKey)
    }

    pub fn is_setting(self) -> bool {
        Self::SETTINGS.contains(&self)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == raw)
            .ok_or_else(|| Error::UnknownSetting(raw.to_string()))
    }
}

/// Current value of `key`, `None` when an optional key is absent.
pub(crate) fn read_field(record: &ConfigurationRecord, key: ConfigKey) -> Option<Value> {
    let value = match key {
        ConfigKey::ActiveProjectId => serde_json::to_value(record.active_project_id.as_ref()?),
        ConfigKey::CoordinateFormat => serde_json::to_value(record.coordinate_format),
        ConfigKey::DiagnosticsEnabled => serde_json::to_value(record.diagnostics_enabled),
        ConfigKey::Locale => serde_json::to_value(&record.locale),
        ConfigKey::RootKey => serde_json::to_value(record.root_key.as_ref()?),
        ConfigKey::TelemetryIdentity => serde_json::to_value(&record.telemetry_identity),
    };
    value.ok()
}

/// Validate `value` against the schema of `key` and store it in `record`.
pub(crate) fn write_field(record: &mut ConfigurationRecord, key: ConfigKey, value: Value) -> Result<()> {
    match key {
        ConfigKey::ActiveProjectId => record.active_project_id = Some(parse(key, value)?),
        ConfigKey::CoordinateFormat => record.coordinate_format = parse(key, value)?,
        ConfigKey::DiagnosticsEnabled => record.diagnostics_enabled = parse(key, value)?,
        ConfigKey::Locale => record.locale = parse(key, value)?,
        ConfigKey::RootKey => record.root_key = Some(parse(key, value)?),
        ConfigKey::TelemetryIdentity => record.telemetry_identity = parse(key, value)?,
    }
    Ok(())
}

/// Remove an optional key, or restore the default of a required one.
pub(crate) fn clear_field(record: &mut ConfigurationRecord, key: ConfigKey, now: DateTime<Utc>) {
    match key {
        ConfigKey::ActiveProjectId => record.active_project_id = None,
        ConfigKey::CoordinateFormat => record.coordinate_format = CoordinateFormat::default(),
        ConfigKey::DiagnosticsEnabled => record.diagnostics_enabled = default_diagnostics_enabled(),
        ConfigKey::Locale => record.locale = Locale::default(),
        ConfigKey::RootKey => record.root_key = None,
        ConfigKey::TelemetryIdentity => record.telemetry_identity = TelemetryIdentity::generate(now),
    }
}

fn parse<T: for<'de> Deserialize<'de>>(key: ConfigKey, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|error| Error::InvalidSetting {
        key: key.to_string(),
        reason: error.to_string(),
    })
}
