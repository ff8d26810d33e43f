//! Version-to-version migration of the configuration document.
//!
//! Version 0 is the unversioned layout written by early builds: the record
//! sat at the document root and the locale was a bare language tag string.

use serde_json::{Map, Value};

use super::schema::MIN_LANGUAGE_TAG_LEN;
use super::LoadError;

/// Version written by this build.
pub const CURRENT_VERSION: u64 = 1;

const VERSION_FIELD: &str = "version";
const STATE_FIELD: &str = "state";

type Migration = fn(Map<String, Value>) -> Map<String, Value>;

/// `MIGRATIONS[n]` upgrades a state from version `n` to `n + 1`.
const MIGRATIONS: [Migration; CURRENT_VERSION as usize] = [migrate_v0_to_v1];

/// Extract the `state` of `document` upgraded to [`CURRENT_VERSION`].
pub(crate) fn upgrade(document: Value) -> Result<Value, LoadError> {
    let Value::Object(mut root) = document else {
        return Err(LoadError::Schema("document root is not an object".to_string()));
    };

    let (version, state) = match root.remove(VERSION_FIELD) {
        Some(raw_version) => {
            let version = raw_version.as_u64().ok_or_else(|| {
                LoadError::Schema(format!("version must be a non-negative integer, got {raw_version}"))
            })?;
            let state = root.remove(STATE_FIELD).unwrap_or_else(|| Value::Object(Map::new()));
            (version, state)
        }
        None if root.contains_key(STATE_FIELD) => {
            let state = root.remove(STATE_FIELD).unwrap_or(Value::Null);
            (CURRENT_VERSION, state)
        }
        None => (0, Value::Object(root)),
    };

    if version > CURRENT_VERSION {
        return Err(LoadError::UnsupportedVersion(version));
    }

    let Value::Object(mut state) = state else {
        return Err(LoadError::Schema("state is not an object".to_string()));
    };
    for migration in &MIGRATIONS[version as usize..] {
        state = migration(state);
    }
    Ok(Value::Object(state))
}

fn migrate_v0_to_v1(mut state: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::String(tag)) = state.get("locale") {
        let tag = tag.trim().to_string();
        // A tag the v1 schema would reject must not take the rest of the record with it.
        if tag.chars().count() < MIN_LANGUAGE_TAG_LEN {
            state.remove("locale");
        } else {
            state.insert(
                "locale".to_string(),
                serde_json::json!({ "useSystemPreferences": false, "languageTag": tag }),
            );
        }
    }
    state
}
