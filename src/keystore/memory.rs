//! In-memory keystore

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

use super::{CredentialStore, MasterKey};

/// Credential store held in process memory
///
/// The master key is the SHA-256 of the password; values are kept as-is.
#[derive(Default)]
pub struct MemoryKeystore {
    password_hash: Option<Zeroizing<Vec<u8>>>,
    values: BTreeMap<String, Zeroizing<String>>,
}

impl MemoryKeystore {
    /// An initialized, empty store protected by `password`
    pub fn new(password: &str) -> Self {
        Self {
            password_hash: Some(hash_password(password)),
            values: BTreeMap::new(),
        }
    }

    /// A store that reports itself as not initialized
    pub fn uninitialized() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.values
            .insert(name.to_string(), Zeroizing::new(value.to_string()));
    }

    pub fn with_value(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }
}

fn hash_password(password: &str) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(Sha256::digest(password.as_bytes()).to_vec())
}

#[async_trait]
impl CredentialStore for MemoryKeystore {
    fn location(&self) -> String {
        "<memory>".to_string()
    }

    async fn is_initialized(&self) -> Result<bool> {
        Ok(self.password_hash.is_some())
    }

    async fn list_registered_names(&self) -> Result<BTreeSet<String>> {
        if self.password_hash.is_none() {
            return Err(Error::MissingStore {
                location: self.location(),
            });
        }
        Ok(self.values.keys().cloned().collect())
    }

    async fn derive_master_key(&self, password: &str) -> Result<MasterKey> {
        let expected = self.password_hash.as_ref().ok_or_else(|| Error::MissingStore {
            location: self.location(),
        })?;

        let derived = hash_password(password);
        if derived.as_slice() != expected.as_slice() {
            return Err(Error::BadPassword);
        }
        Ok(MasterKey::new(derived.to_vec()))
    }

    async fn read_value(&self, name: &str, master_key: &MasterKey) -> Result<Zeroizing<String>> {
        let expected = self.password_hash.as_ref().ok_or_else(|| Error::MissingStore {
            location: self.location(),
        })?;

        let value = self
            .values
            .get(name)
            .ok_or_else(|| Error::KeyNotFound(name.to_string()))?;

        if master_key.as_bytes() != expected.as_slice() {
            return Err(Error::DecryptionFailed(name.to_string()));
        }
        Ok(value.clone())
    }
}
