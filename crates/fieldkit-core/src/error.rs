//! Error types for the FieldKit core.
//!
//! Only failures a caller has to act on live here. Recoverable read failures
//! of the configuration store are absorbed inside [`crate::config`] and never
//! leave it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the core [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A root key supplied from outside (environment override or stored
    /// configuration) is not 32 hex digits. Fatal at startup.
    #[error("Invalid root key: {0}")]
    InvalidRootKey(String),

    /// The domain service process could not be launched. Fatal at startup.
    #[error("Failed to spawn domain service `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Preparing the service storage directory failed before the spawn.
    #[error("Failed to prepare service storage directory {path}: {source}")]
    StorageDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Persisting the configuration record failed (the cross-device case is
    /// handled internally and never surfaces here).
    #[error("Failed to write configuration {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A value handed to `set` does not match the schema of its field.
    #[error("Invalid value for setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Unknown setting '{0}'")]
    UnknownSetting(String),
}

impl Error {
    /// Returns true for failures that must abort application startup.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Error::InvalidRootKey(_)
                | Error::Spawn { .. }
                | Error::StorageDirectory { .. }
                | Error::StoreWrite { .. }
        )
    }
}
