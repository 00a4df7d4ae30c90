//! Secret resolution
//!
//! Resolves every catalog entry, in order, into a wallet:
//!
//! ```text
//! consent gate (once) → for each entry:
//!     plaintext value? ── yes, consented ──→ materialize ──ok──→ wallet
//!            │                                   └─invalid key─┐
//!            no                                                ↓
//!            └────────→ keystore checks → master key (once) → decrypt → materialize → wallet
//! ```
//!
//! The first fatal error aborts the run and no wallets are returned.

use std::sync::Arc;

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::interrupt::Interrupter;
use crate::keystore::CredentialStore;
use crate::wallet::{materialize, NetworkProvider, ResolvedWallets, WalletHandle};

use super::catalog::{KeyFamily, SecretCatalog, SecretCatalogEntry};
use super::plaintext::{evaluate_consent, PlaintextSource};
use super::session::CredentialStoreSession;

/// Default plaintext key holding the keystore password
pub const DEFAULT_PASSWORD_KEY: &str = "KEYSTORE_PASSWORD";

/// Resolves the secret catalog into wallets
pub struct SecretResolver {
    catalog: SecretCatalog,
    store: Arc<dyn CredentialStore>,
    plaintext: Arc<dyn PlaintextSource>,
    interrupter: Arc<dyn Interrupter>,
    provider: NetworkProvider,
    password_key: String,
}

impl SecretResolver {
    pub fn new(
        catalog: SecretCatalog,
        store: Arc<dyn CredentialStore>,
        plaintext: Arc<dyn PlaintextSource>,
        interrupter: Arc<dyn Interrupter>,
        provider: NetworkProvider,
    ) -> Self {
        Self {
            catalog,
            store,
            plaintext,
            interrupter,
            provider,
            password_key: DEFAULT_PASSWORD_KEY.to_string(),
        }
    }

    /// Plaintext key read as the keystore password override
    pub fn with_password_key(mut self, key: impl Into<String>) -> Self {
        self.password_key = key.into();
        self
    }

    pub fn catalog(&self) -> &SecretCatalog {
        &self.catalog
    }

    /// Resolve every catalog entry into a wallet
    ///
    /// May prompt for plaintext consent and for the keystore password, each
    /// at most once. Must not run concurrently with itself.
    pub async fn resolve(&self) -> Result<ResolvedWallets> {
        let consent = evaluate_consent(
            &self.catalog,
            self.plaintext.as_ref(),
            self.interrupter.as_ref(),
        )
        .await?;

        if consent.denied() {
            return Err(Error::PlaintextDenied {
                found: consent.found,
            });
        }

        let using_plaintext = consent.granted;
        let mut session = CredentialStoreSession::new(
            self.store.as_ref(),
            self.plaintext.lookup(&self.password_key),
        );
        let mut wallets = ResolvedWallets::default();
        let last = self.catalog.len().saturating_sub(1);

        for (index, entry) in self.catalog.iter().enumerate() {
            if !using_plaintext && index == 0 {
                info!("🔒 Decrypting keystore secrets...");
            }

            let handle = self
                .resolve_entry(entry, using_plaintext, &mut session)
                .await?;
            log_wallet(entry, &handle);

            if !wallets.insert(entry.short_name(), handle) {
                return Err(Error::Config(format!(
                    "Duplicate secret {} in catalog",
                    entry.catalog_name()
                )));
            }

            if !using_plaintext && index == last {
                info!("🔓 Successfully decrypted keystore secrets!");
            }
        }

        // Dropping the session zeroizes the master key
        drop(session);
        Ok(wallets)
    }

    async fn resolve_entry(
        &self,
        entry: &SecretCatalogEntry,
        using_plaintext: bool,
        session: &mut CredentialStoreSession<'_>,
    ) -> Result<WalletHandle> {
        let name = entry.catalog_name();

        if let Some(value) = self.plaintext.lookup(name) {
            if !using_plaintext {
                return Err(Error::PlaintextDenied {
                    found: vec![name.to_string()],
                });
            }

            warn!("⚠ Reading secret {} from .env file", name);
            match materialize(entry, &value, &self.provider) {
                Ok(handle) => return Ok(handle),
                Err(e) if e.allows_store_fallback() => {
                    warn!(
                        "⚠ Failed to load private key {} from .env file ({}). \
                         Will try to decrypt secret from the encrypted keystore instead.",
                        name, e
                    );
                }
                Err(e) => return Err(e),
            }
        } else if using_plaintext {
            warn!("⚠ Decrypting secret {} from the encrypted keystore", name);
        }

        let handle = self.decrypt_entry(entry, using_plaintext, session).await;
        if let Err(e) = &handle {
            if using_plaintext {
                warn!(
                    "⚠ Failed to decrypt secret {} from the encrypted keystore: {}",
                    name, e
                );
            }
        }
        handle
    }

    async fn decrypt_entry(
        &self,
        entry: &SecretCatalogEntry,
        verbose: bool,
        session: &mut CredentialStoreSession<'_>,
    ) -> Result<WalletHandle> {
        let value: Zeroizing<String> = session
            .decrypt(entry.catalog_name(), self.interrupter.as_ref(), verbose)
            .await?;

        let handle = materialize(entry, &value, &self.provider)?;
        if verbose {
            info!("🔓 Successfully decrypted keystore secret!");
        }
        Ok(handle)
    }
}

fn log_wallet(entry: &SecretCatalogEntry, handle: &WalletHandle) {
    match entry.key_family() {
        KeyFamily::EvmStyle => {
            info!("NeonEVM {} address: {}", entry.short_name(), handle.public_id())
        }
        KeyFamily::Ed25519Style => {
            let label = entry
                .short_name()
                .strip_prefix("solanaU")
                .map(|rest| format!("u{}", rest))
                .unwrap_or_else(|| entry.short_name().to_string());
            info!("Solana {} address: {}", label, handle.public_id())
        }
    }
}
