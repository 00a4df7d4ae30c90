//! Secret catalog and key classification
//!
//! The catalog is the ordered list of private key secrets a run resolves.
//! Each entry is classified once, when the catalog is built, so the key
//! family is never re-derived from the name downstream.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Catalog names resolved by default, in resolution order
pub const STANDARD_SECRET_NAMES: [&str; 8] = [
    "PRIVATE_KEY_OWNER",
    "PRIVATE_KEY_USER_1",
    "PRIVATE_KEY_USER_2",
    "PRIVATE_KEY_USER_3",
    "PRIVATE_KEY_SOLANA",
    "PRIVATE_KEY_SOLANA_2",
    "PRIVATE_KEY_SOLANA_3",
    "PRIVATE_KEY_SOLANA_4",
];

const PRIVATE_KEY_PREFIX: &str = "PRIVATE_KEY_";

/// Raw key encoding and wallet construction used for a secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFamily {
    /// 32-byte secp256k1 key as 64 hex chars (NeonEVM signer)
    EvmStyle,

    /// 64-byte ed25519 secret key, base58 encoded (Solana keypair)
    Ed25519Style,
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFamily::EvmStyle => write!(f, "evm"),
            KeyFamily::Ed25519Style => write!(f, "ed25519"),
        }
    }
}

/// Result of classifying a catalog name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub short_name: String,
    pub key_family: KeyFamily,
}

/// Classify a catalog name into its short name and key family
///
/// Recognized shapes:
/// - `PRIVATE_KEY_OWNER` → `owner`
/// - `PRIVATE_KEY_USER_<N>` → `user<N>`
/// - `PRIVATE_KEY_SOLANA` → `solanaUser1`
/// - `PRIVATE_KEY_SOLANA_<N>` (N ≥ 2) → `solanaUser<N>`
///
/// Anything else is a programmer error and yields `Error::Classification`.
pub fn classify(catalog_name: &str) -> Result<Classification> {
    let unrecognized = || Error::Classification(catalog_name.to_string());

    let rest = catalog_name
        .strip_prefix(PRIVATE_KEY_PREFIX)
        .ok_or_else(unrecognized)?;
    let parts: Vec<&str> = rest.split('_').collect();

    let (short_name, key_family) = match parts.as_slice() {
        ["OWNER"] => ("owner".to_string(), KeyFamily::EvmStyle),
        ["USER", n] => {
            let index = parse_index(n).ok_or_else(unrecognized)?;
            (format!("user{}", index), KeyFamily::EvmStyle)
        }
        ["SOLANA"] => ("solanaUser1".to_string(), KeyFamily::Ed25519Style),
        ["SOLANA", n] => {
            let index = parse_index(n).filter(|i| *i >= 2).ok_or_else(unrecognized)?;
            (format!("solanaUser{}", index), KeyFamily::Ed25519Style)
        }
        _ => return Err(unrecognized()),
    };

    Ok(Classification {
        short_name,
        key_family,
    })
}

/// Parse a positive decimal index without sign or leading zeros
fn parse_index(raw: &str) -> Option<u32> {
    if raw.is_empty() || raw.starts_with('0') || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok().filter(|i| *i > 0)
}

/// A classified secret the resolver looks up by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretCatalogEntry {
    catalog_name: String,
    short_name: String,
    key_family: KeyFamily,
}

impl SecretCatalogEntry {
    /// Classify a catalog name into an entry
    pub fn new(catalog_name: &str) -> Result<Self> {
        let Classification {
            short_name,
            key_family,
        } = classify(catalog_name)?;

        Ok(Self {
            catalog_name: catalog_name.to_string(),
            short_name,
            key_family,
        })
    }

    /// Name used in the keystore and plaintext source (`PRIVATE_KEY_USER_1`)
    pub fn catalog_name(&self) -> &str {
        &self.catalog_name
    }

    /// Key in the resolved wallet map (`user1`)
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn key_family(&self) -> KeyFamily {
        self.key_family
    }
}

/// Ordered, immutable list of secrets to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretCatalog {
    entries: Vec<SecretCatalogEntry>,
}

impl SecretCatalog {
    /// The standard 8-secret catalog
    pub fn standard() -> Result<Self> {
        Self::from_names(STANDARD_SECRET_NAMES)
    }

    /// Build a catalog from names, preserving order
    ///
    /// Fails on unrecognized names and on names that collide on short name.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for name in names {
            let entry = SecretCatalogEntry::new(name.as_ref())?;
            if !seen.insert(entry.short_name.clone()) {
                return Err(Error::Config(format!(
                    "Duplicate secret {} in catalog",
                    entry.catalog_name
                )));
            }
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[SecretCatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecretCatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry by catalog name
    pub fn get(&self, catalog_name: &str) -> Option<&SecretCatalogEntry> {
        self.entries.iter().find(|e| e.catalog_name == catalog_name)
    }
}
