//! Monthly pseudonymous diagnostic identity.
//!
//! The id is stable inside one UTC calendar month so diagnostic events can be
//! correlated, and replaced as soon as the month changes.

use chrono::{DateTime, Datelike, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

const IDENTITY_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryIdentity {
    pub id: String,
    pub month_tag: String,
}

/// `"<year>-<zero-indexed month>"` for the UTC month containing `now`.
pub fn month_tag(now: DateTime<Utc>) -> String {
    format!("{}-{}", now.year(), now.month0())
}

impl TelemetryIdentity {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; IDENTITY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self {
            id: hex::encode(bytes),
            month_tag: month_tag(now),
        }
    }

    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.month_tag == month_tag(now)
    }

    /// Whether `id` has the shape [`TelemetryIdentity::generate`] produces.
    pub fn has_well_formed_id(&self) -> bool {
        let mut bytes = [0u8; IDENTITY_BYTES];
        hex::decode_to_slice(&self.id, &mut bytes).is_ok()
    }
}

/// Keep `current` if it belongs to the month of `now` and its id is 128-bit
/// hex, otherwise mint a new identity. The flag reports whether a new one was
/// minted.
pub fn rotate(current: Option<TelemetryIdentity>, now: DateTime<Utc>) -> (TelemetryIdentity, bool) {
    match current {
        Some(identity) if identity.is_current(now) && identity.has_well_formed_id() => {
            (identity, false)
        }
        _ => (TelemetryIdentity::generate(now), true),
    }
}
