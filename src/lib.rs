//! NeonEVM / Solana secret resolution
//!
//! Resolves the project's private keys from an encrypted keystore (or
//! consented plaintext overrides) into NeonEVM signers and Solana keypairs.

pub mod cli;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod keystore;
pub mod secrets;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use secrets::SecretResolver;
pub use wallet::{ResolvedWallets, WalletHandle};
