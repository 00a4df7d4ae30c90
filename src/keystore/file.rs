//! File-backed keystore
//!
//! Layout of `<project>-keystore.json`:
//!
//! ```text
//! {
//!   "version": 1,
//!   "created_at": "...",
//!   "kdf": { "algorithm": "argon2id", "salt": b64, "m_cost", "t_cost", "p_cost" },
//!   "password_check": { "nonce": b64, "ciphertext": b64 },
//!   "secrets": { NAME: { "nonce": b64, "ciphertext": b64 } }
//! }
//! ```
//!
//! Every ciphertext is AES-256-GCM under the Argon2id master key, with the
//! secret name as associated data so entries cannot be swapped.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

use super::{CredentialStore, MasterKey};

const KEYSTORE_VERSION: u32 = 1;
const KDF_ALGORITHM: &str = "argon2id";
const MASTER_KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

const PASSWORD_CHECK_AAD: &[u8] = b"password_check";
const PASSWORD_CHECK_MARKER: &[u8] = b"neon-secrets keystore";

/// Argon2id cost parameters for newly created keystores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KdfSection {
    algorithm: String,
    salt: String,
    #[serde(flatten)]
    params: KdfParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sealed {
    nonce: String,
    ciphertext: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeystoreDocument {
    version: u32,
    created_at: DateTime<Utc>,
    kdf: KdfSection,
    password_check: Sealed,
    #[serde(default)]
    secrets: BTreeMap<String, Sealed>,
}

/// Password-protected keystore stored as a JSON file
#[derive(Debug, Clone)]
pub struct FileKeystore {
    path: PathBuf,
    kdf_params: KdfParams,
}

impl FileKeystore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kdf_params: KdfParams::default(),
        }
    }

    /// Cost parameters used when `initialize` creates the file
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf_params = params;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty keystore protected by `password`
    ///
    /// Refuses to overwrite an existing file.
    pub async fn initialize(&self, password: &str) -> Result<MasterKey> {
        if self.path.exists() {
            return Err(Error::Keystore(format!(
                "Keystore already exists at {}",
                self.path.display()
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);

        let master_key = derive_key(password, &salt, &self.kdf_params)?;
        let password_check = seal(&master_key, PASSWORD_CHECK_AAD, PASSWORD_CHECK_MARKER)?;

        let document = KeystoreDocument {
            version: KEYSTORE_VERSION,
            created_at: Utc::now(),
            kdf: KdfSection {
                algorithm: KDF_ALGORITHM.to_string(),
                salt: BASE64.encode(salt),
                params: self.kdf_params,
            },
            password_check,
            secrets: BTreeMap::new(),
        };

        self.save(&document).await?;
        info!("Created keystore at {}", self.path.display());

        Ok(master_key)
    }

    /// Encrypt and store a value, replacing any previous value
    pub async fn set_value(&self, name: &str, value: &str, master_key: &MasterKey) -> Result<()> {
        let mut document = self.load().await?;
        let sealed = seal(master_key, name.as_bytes(), value.as_bytes())?;
        document.secrets.insert(name.to_string(), sealed);
        self.save(&document).await?;

        info!("Stored secret {} in keystore", name);
        Ok(())
    }

    /// Remove a value; returns false if it was not registered
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let mut document = self.load().await?;
        if document.secrets.remove(name).is_none() {
            return Ok(false);
        }
        self.save(&document).await?;

        info!("Removed secret {} from keystore", name);
        Ok(true)
    }

    async fn load(&self) -> Result<KeystoreDocument> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingStore {
                    location: self.location(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let document: KeystoreDocument = serde_json::from_str(&content).map_err(|e| {
            Error::Keystore(format!(
                "Failed to parse keystore {}: {}",
                self.path.display(),
                e
            ))
        })?;

        if document.version != KEYSTORE_VERSION {
            return Err(Error::Keystore(format!(
                "Unsupported keystore version {}",
                document.version
            )));
        }
        if document.kdf.algorithm != KDF_ALGORITHM {
            return Err(Error::Keystore(format!(
                "Unsupported key derivation {}",
                document.kdf.algorithm
            )));
        }

        Ok(document)
    }

    async fn save(&self, document: &KeystoreDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(document)?;

        // Write then rename so a crash never leaves a truncated keystore
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp_path, &self.path).await?;
        debug!("Saved keystore to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileKeystore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn is_initialized(&self) -> Result<bool> {
        Ok(tokio::fs::try_exists(&self.path).await?)
    }

    async fn list_registered_names(&self) -> Result<BTreeSet<String>> {
        let document = self.load().await?;
        Ok(document.secrets.into_keys().collect())
    }

    async fn derive_master_key(&self, password: &str) -> Result<MasterKey> {
        let document = self.load().await?;
        let salt = decode_b64("kdf salt", &document.kdf.salt)?;
        let master_key = derive_key(password, &salt, &document.kdf.params)?;

        open(&master_key, PASSWORD_CHECK_AAD, &document.password_check)
            .map_err(|_| Error::BadPassword)?;

        Ok(master_key)
    }

    async fn read_value(&self, name: &str, master_key: &MasterKey) -> Result<Zeroizing<String>> {
        let document = self.load().await?;
        let sealed = document
            .secrets
            .get(name)
            .ok_or_else(|| Error::KeyNotFound(name.to_string()))?;

        let plaintext = Zeroizing::new(
            open(master_key, name.as_bytes(), sealed)
                .map_err(|_| Error::DecryptionFailed(name.to_string()))?,
        );

        let value = String::from_utf8(plaintext.to_vec())
            .map_err(|_| Error::DecryptionFailed(name.to_string()))?;
        Ok(Zeroizing::new(value))
    }
}

fn derive_key(password: &str, salt: &[u8], params: &KdfParams) -> Result<MasterKey> {
    let params = Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(MASTER_KEY_LEN),
    )
    .map_err(|e| Error::Keystore(format!("Invalid key derivation parameters: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut output = vec![0u8; MASTER_KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut output)
        .map_err(|e| Error::Keystore(format!("Key derivation failed: {}", e)))?;

    Ok(MasterKey::new(output))
}

fn cipher(master_key: &MasterKey) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(master_key.as_bytes())
        .map_err(|_| Error::Keystore("Master key has wrong length".into()))
}

fn seal(master_key: &MasterKey, aad: &[u8], plaintext: &[u8]) -> Result<Sealed> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher(master_key)?
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|_| Error::Keystore("Encryption failed".into()))?;

    Ok(Sealed {
        nonce: BASE64.encode(nonce),
        ciphertext: BASE64.encode(ciphertext),
    })
}

fn open(master_key: &MasterKey, aad: &[u8], sealed: &Sealed) -> Result<Vec<u8>> {
    let nonce = decode_b64("nonce", &sealed.nonce)?;
    if nonce.len() != NONCE_LEN {
        return Err(Error::Keystore("Corrupt nonce length".into()));
    }
    let ciphertext = decode_b64("ciphertext", &sealed.ciphertext)?;

    cipher(master_key)?
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &ciphertext,
                aad,
            },
        )
        .map_err(|_| Error::Keystore("Authentication failed".into()))
}

fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| Error::Keystore(format!("Corrupt {} in keystore: {}", field, e)))
}
