//! Secret resolution module
//!
//! Decides, per catalog secret, whether to use a consented plaintext
//! override or the encrypted keystore, and turns the value into a wallet.
//!
//! # Architecture
//!
//! ```text
//! SecretCatalog → consent gate → SecretResolver → CredentialStoreSession → CredentialStore
//!                                      ↓
//!                                 materialize → ResolvedWallets
//! ```

pub mod catalog;
pub mod plaintext;
pub mod resolver;
pub mod session;

pub use catalog::{classify, KeyFamily, SecretCatalog, SecretCatalogEntry, STANDARD_SECRET_NAMES};
pub use plaintext::{evaluate_consent, ConsentDecision, EnvSource, PlaintextSource};
pub use resolver::{SecretResolver, DEFAULT_PASSWORD_KEY};
pub use session::CredentialStoreSession;
