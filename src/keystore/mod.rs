//! Encrypted credential store
//!
//! The resolver only sees the [`CredentialStore`] capability. Two adapters
//! are provided:
//! - [`FileKeystore`]: password-protected JSON file (Argon2id + AES-256-GCM)
//! - [`MemoryKeystore`]: in-process store for embedding and tests

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::Result;

pub mod file;
pub mod memory;

pub use file::{FileKeystore, KdfParams};
pub use memory::MemoryKeystore;

/// Symmetric key derived from the keystore password
///
/// Zeroized on drop and never printed.
pub struct MasterKey(Zeroizing<Vec<u8>>);

impl MasterKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(***)")
    }
}

/// Password-gated secret storage
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Human-readable location used in error messages
    fn location(&self) -> String;

    /// Whether the store has been created
    async fn is_initialized(&self) -> Result<bool>;

    /// Names registered in the store (readable without the password)
    async fn list_registered_names(&self) -> Result<BTreeSet<String>>;

    /// Derive and verify the master key; `Error::BadPassword` on mismatch
    async fn derive_master_key(&self, password: &str) -> Result<MasterKey>;

    /// Decrypt a value; `Error::KeyNotFound` or `Error::DecryptionFailed`
    async fn read_value(&self, name: &str, master_key: &MasterKey) -> Result<Zeroizing<String>>;
}
