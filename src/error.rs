//! Error types for secret resolution

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for secret resolution and keystore management
#[derive(Error, Debug)]
pub enum Error {
    // Plaintext override errors
    #[error(
        "User denied using plain-text secrets ({}). Please remove them from the .env file and \
         store them in the encrypted keystore instead: secrets keystore set <KEY>",
        .found.join(", ")
    )]
    PlaintextDenied { found: Vec<String> },

    // Catalog errors
    #[error("Not implemented: {0} is not a recognized private key secret name")]
    Classification(String),

    // Keystore setup errors
    #[error("No keystore file found at {location}. Please set one up using: secrets keystore set <KEY>")]
    MissingStore { location: String },

    #[error("{0} key not found in project's keystore file. Please set it up using: secrets keystore set {0}")]
    UnknownSecretInStore(String),

    // Keystore access errors
    #[error("Invalid keystore password")]
    BadPassword,

    #[error("Failed to decrypt secret {0} from the encrypted keystore")]
    DecryptionFailed(String),

    #[error("Secret {0} not found in the encrypted keystore")]
    KeyNotFound(String),

    #[error("Keystore error: {0}")]
    Keystore(String),

    // Key material errors
    #[error("Invalid private key {secret}: {reason}")]
    InvalidKeyMaterial { secret: String, reason: String },

    // Interactive input errors
    #[error("Prompt failed: {0}")]
    Prompt(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Build an `InvalidKeyMaterial` error for a named secret
    pub fn invalid_key(secret: &str, reason: impl Into<String>) -> Self {
        Error::InvalidKeyMaterial {
            secret: secret.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if a plaintext-sourced failure may fall back to the keystore
    pub fn allows_store_fallback(&self) -> bool {
        matches!(self, Error::InvalidKeyMaterial { .. })
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

// Conversion from dialoguer errors
impl From<dialoguer::Error> for Error {
    fn from(e: dialoguer::Error) -> Self {
        Error::Prompt(e.to_string())
    }
}
