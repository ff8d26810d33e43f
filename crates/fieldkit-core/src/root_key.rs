//! Root key provisioning.
//!
//! The root key seeds the cryptographic identity of the domain service's
//! local data store. It is created once per installation, kept in the
//! configuration store and never rotated.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::ConfigStore;
use crate::error::{Error, Result};

/// Size of the root key in bytes.
pub const ROOT_KEY_SIZE: usize = 16;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RootKey {
    bytes: [u8; ROOT_KEY_SIZE],
}

impl RootKey {
    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ROOT_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Parse a hex encoded key. Exactly 32 hex digits are accepted.
    pub fn from_hex(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != ROOT_KEY_SIZE * 2 {
            return Err(Error::InvalidRootKey(format!(
                "expected {} hex characters, got {}",
                ROOT_KEY_SIZE * 2,
                trimmed.len()
            )));
        }

        let mut bytes = [0u8; ROOT_KEY_SIZE];
        hex::decode_to_slice(trimmed, &mut bytes)
            .map_err(|error| Error::InvalidRootKey(error.to_string()))?;
        Ok(Self { bytes })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ROOT_KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Debug for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootKey(<redacted>)")
    }
}

/// Resolve the installation root key.
///
/// An override (development reproducibility) wins and is never persisted.
/// Otherwise the stored key is used, and on first run a new key is generated
/// and written to the store. Malformed input from either source is an error;
/// regenerating would silently change the installation identity.
pub fn provision(override_hex: Option<&str>, store: &ConfigStore) -> Result<RootKey> {
    if let Some(raw) = override_hex {
        let key = RootKey::from_hex(raw)?;
        info!("using root key from environment override");
        return Ok(key);
    }

    if let Some(stored) = store.root_key() {
        return RootKey::from_hex(&stored);
    }

    let key = RootKey::generate();
    store.set_root_key(&key.to_hex())?;
    info!("generated new installation root key");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreOptions;

    const KEY_HEX: &str = "00112233445566778899aabbccddeeff";

    fn open_store(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::open(dir.path().join("config.json"), StoreOptions::default())
            .expect("store should open")
    }

    #[test]
    fn from_hex_round_trips() {
        let key = RootKey::from_hex(KEY_HEX).unwrap();
        assert_eq!(key.to_hex(), KEY_HEX);
        assert_eq!(key.as_bytes()[1], 0x11);
    }

    #[test]
    fn from_hex_rejects_wrong_length_and_digits() {
        assert!(matches!(
            RootKey::from_hex("abcd"),
            Err(Error::InvalidRootKey(_))
        ));
        assert!(matches!(
            RootKey::from_hex(&"zz".repeat(16)),
            Err(Error::InvalidRootKey(_))
        ));
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = RootKey::from_hex(KEY_HEX).unwrap();
        assert!(!format!("{key:?}").contains("0011"));
    }

    #[test]
    fn override_is_used_and_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let key = provision(Some(KEY_HEX), &store).unwrap();

        assert_eq!(key.to_hex(), KEY_HEX);
        assert_eq!(store.root_key(), None);
    }

    #[test]
    fn malformed_override_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let error = provision(Some("not-hex"), &store).unwrap_err();
        assert!(error.is_fatal_at_startup());
    }

    #[test]
    fn first_run_generates_and_persists_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let first = provision(None, &store).unwrap();
        assert_eq!(store.root_key(), Some(first.to_hex()));

        let reopened = open_store(&dir);
        let second = provision(None, &reopened).unwrap();
        assert_eq!(first.to_hex(), second.to_hex());
    }
}
