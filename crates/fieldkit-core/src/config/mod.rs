//! Durable configuration store.
//!
//! A single JSON document `{ "version": <int>, "state": <record> }`. Reads
//! never fail the caller: a missing, unreadable or invalid file falls back to
//! schema defaults and is logged. Writes go through [`atomic_write`] and fail
//! the mutation that triggered them.

pub mod atomic_write;
mod migrations;
mod schema;
mod store;

use std::io;

use thiserror::Error;

pub use atomic_write::{RenameFn, WriteOutcome};
pub use migrations::CURRENT_VERSION;
pub use schema::{
    ConfigKey, ConfigurationRecord, CoordinateFormat, Locale, PublicSettings,
    MIN_LANGUAGE_TAG_LEN,
};
pub use store::{ConfigStore, StoreOptions};

/// Reasons a stored document was discarded in favour of defaults.
#[derive(Debug, Error)]
pub(crate) enum LoadError {
    #[error("configuration file does not exist")]
    Missing,

    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),

    #[error("configuration is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("configuration violates schema: {0}")]
    Schema(String),

    #[error("configuration version {0} is newer than this build supports")]
    UnsupportedVersion(u64),
}
