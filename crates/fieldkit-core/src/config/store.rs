use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::atomic_write::{self, RenameFn, WriteOutcome};
use super::migrations::{self, CURRENT_VERSION};
use super::schema::{
    self, ConfigKey, ConfigurationRecord, CoordinateFormat, Locale, PublicSettings, StoredState,
};
use super::LoadError;
use crate::error::{Error, Result};
use crate::telemetry::TelemetryIdentity;

#[derive(Clone, Copy)]
pub struct StoreOptions {
    /// Pretty-print the document (development builds).
    pub pretty: bool,
    pub rename: RenameFn,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            pretty: cfg!(debug_assertions),
            rename: atomic_write::std_rename,
        }
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("pretty", &self.pretty)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct Document<'a> {
    version: u64,
    state: &'a ConfigurationRecord,
}

/// The settings record, owned by the shell process.
///
/// Every mutation persists the whole record before it becomes visible; a
/// failed write leaves the in-memory record untouched. There is no guard
/// against another process writing the same file (last write wins).
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    options: StoreOptions,
    record: Mutex<ConfigurationRecord>,
}

impl ConfigStore {
    pub fn open(path: impl Into<PathBuf>, options: StoreOptions) -> Result<Self> {
        Self::open_at(path, options, Utc::now())
    }

    /// Load the record as of `now`, rotate the telemetry identity if its month
    /// has passed, then write the record back so defaults become explicit on
    /// disk. Only that write can fail.
    pub fn open_at(path: impl Into<PathBuf>, options: StoreOptions, now: DateTime<Utc>) -> Result<Self> {
        let path = path.into();
        let record = load(&path, now);
        persist(&path, options, &record)?;
        Ok(Self {
            path,
            options,
            record: Mutex::new(record),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> ConfigurationRecord {
        self.lock().clone()
    }

    pub fn public_settings(&self) -> PublicSettings {
        PublicSettings::from(&*self.lock())
    }

    pub fn get(&self, key: ConfigKey) -> Option<Value> {
        schema::read_field(&self.lock(), key)
    }

    pub fn set(&self, key: ConfigKey, value: Value) -> Result<()> {
        self.update(|record| schema::write_field(record, key, value))
    }

    /// Remove `key` from the stored state. Optional keys disappear from the
    /// document entirely (not `null`); required keys go back to their default.
    pub fn delete(&self, key: ConfigKey) -> Result<()> {
        self.update(|record| {
            schema::clear_field(record, key, Utc::now());
            Ok(())
        })
    }

    pub fn active_project_id(&self) -> Option<String> {
        self.lock().active_project_id.clone()
    }

    pub fn set_active_project_id(&self, project_id: &str) -> Result<()> {
        self.set(ConfigKey::ActiveProjectId, Value::from(project_id))
    }

    pub fn coordinate_format(&self) -> CoordinateFormat {
        self.lock().coordinate_format
    }

    pub fn set_coordinate_format(&self, format: CoordinateFormat) -> Result<()> {
        self.update(|record| {
            record.coordinate_format = format;
            Ok(())
        })
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.lock().diagnostics_enabled
    }

    pub fn set_diagnostics_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|record| {
            record.diagnostics_enabled = enabled;
            Ok(())
        })
    }

    pub fn locale(&self) -> Locale {
        self.lock().locale.clone()
    }

    pub fn set_locale(&self, locale: Locale) -> Result<()> {
        self.update(|record| {
            record.locale = locale;
            Ok(())
        })
    }

    pub fn root_key(&self) -> Option<String> {
        self.lock().root_key.clone()
    }

    pub(crate) fn set_root_key(&self, root_key_hex: &str) -> Result<()> {
        self.set(ConfigKey::RootKey, Value::from(root_key_hex))
    }

    pub fn telemetry_identity(&self) -> TelemetryIdentity {
        self.lock().telemetry_identity.clone()
    }

    fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut ConfigurationRecord) -> Result<()>,
    {
        let mut guard = self.lock();
        let mut next = guard.clone();
        mutate(&mut next)?;
        persist(&self.path, self.options, &next)?;
        *guard = next;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ConfigurationRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load(path: &Path, now: DateTime<Utc>) -> ConfigurationRecord {
    match read_record(path, now) {
        Ok(record) => record,
        Err(LoadError::Missing) => {
            info!(path = %path.display(), "no configuration file yet, using defaults");
            ConfigurationRecord::defaults(now)
        }
        Err(error) => {
            warn!(
                path = %path.display(),
                %error,
                "discarding stored configuration, falling back to defaults"
            );
            ConfigurationRecord::defaults(now)
        }
    }
}

fn read_record(path: &Path, now: DateTime<Utc>) -> std::result::Result<ConfigurationRecord, LoadError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Err(LoadError::Missing),
        Err(error) => return Err(LoadError::Io(error)),
    };

    let document: Value = serde_json::from_str(&raw).map_err(LoadError::Json)?;
    let state = migrations::upgrade(document)?;
    let stored: StoredState =
        serde_json::from_value(state).map_err(|error| LoadError::Schema(error.to_string()))?;

    let (record, rotated) = stored.into_record(now);
    if rotated {
        info!(month = %record.telemetry_identity.month_tag, "rotated telemetry identity");
    }
    Ok(record)
}

fn persist(path: &Path, options: StoreOptions, record: &ConfigurationRecord) -> Result<()> {
    let document = Document {
        version: CURRENT_VERSION,
        state: record,
    };
    let bytes = if options.pretty {
        serde_json::to_vec_pretty(&document)?
    } else {
        serde_json::to_vec(&document)?
    };

    let outcome = atomic_write::write_atomic(path, &bytes, options.rename).map_err(|source| {
        Error::StoreWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    if outcome == WriteOutcome::InPlace {
        debug!(path = %path.display(), "configuration written without atomic rename");
    }
    Ok(())
}
