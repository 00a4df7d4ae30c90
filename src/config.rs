//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::secrets::{SecretCatalog, DEFAULT_PASSWORD_KEY, STANDARD_SECRET_NAMES};
use crate::wallet::NetworkProvider;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub keystore: KeystoreConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
}

/// Where the project's encrypted keystore lives
#[derive(Debug, Clone, Deserialize)]
pub struct KeystoreConfig {
    /// Directory holding keystore files
    #[serde(default = "default_keystore_directory")]
    pub directory: PathBuf,

    /// Project name; the file is `<project>-keystore.json`
    #[serde(default = "default_project")]
    pub project: String,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            directory: default_keystore_directory(),
            project: default_project(),
        }
    }
}

impl KeystoreConfig {
    /// Project-specific keystore file path
    pub fn file_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}-keystore.json", self.project))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_evm_rpc_url")]
    pub evm_rpc_url: String,
    #[serde(default = "default_evm_chain_id")]
    pub evm_chain_id: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            evm_rpc_url: default_evm_rpc_url(),
            evm_chain_id: default_evm_chain_id(),
        }
    }
}

impl NetworkConfig {
    pub fn provider(&self) -> crate::Result<NetworkProvider> {
        NetworkProvider::new(&self.evm_rpc_url, self.evm_chain_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecretsConfig {
    /// Catalog names, in resolution order
    #[serde(default = "default_secret_names")]
    pub names: Vec<String>,

    /// Plaintext key holding the keystore password
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            names: default_secret_names(),
            password_env: default_password_env(),
        }
    }
}

impl SecretsConfig {
    pub fn catalog(&self) -> crate::Result<SecretCatalog> {
        SecretCatalog::from_names(&self.names)
    }
}

// Default value functions
fn default_keystore_directory() -> PathBuf {
    PathBuf::from(".keystore")
}

fn default_project() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_evm_rpc_url() -> String {
    "https://devnet.neonevm.org".into()
}

fn default_evm_chain_id() -> u64 {
    245022926
}

fn default_secret_names() -> Vec<String> {
    STANDARD_SECRET_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_password_env() -> String {
    DEFAULT_PASSWORD_KEY.into()
}

impl Config {
    /// Load configuration from file and environment
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(path.as_ref(), environment())
    }

    fn load_with_env(path: &Path, env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix NEON_SECRETS__)
            .add_source(env)
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.network
            .provider()
            .context("Invalid network configuration")?;

        if self.secrets.names.is_empty() {
            anyhow::bail!("secrets.names cannot be empty");
        }

        self.secrets
            .catalog()
            .context("Invalid secrets.names")?;

        if self.secrets.password_env.trim().is_empty() {
            anyhow::bail!("secrets.password_env cannot be empty");
        }

        if self.keystore.project.trim().is_empty() {
            anyhow::bail!("keystore.project cannot be empty");
        }

        Ok(())
    }
}

/// `NEON_SECRETS__SECTION__KEY` overrides; `secrets.names` is comma separated
fn environment() -> config::Environment {
    config::Environment::with_prefix("NEON_SECRETS")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("secrets.names")
        .try_parsing(true)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keystore: KeystoreConfig::default(),
            network: NetworkConfig::default(),
            secrets: SecretsConfig::default(),
        }
    }
}
