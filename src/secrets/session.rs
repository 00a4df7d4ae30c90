//! Keystore session for one resolution run
//!
//! Holds the master key once derived so the password is asked for at most
//! once per run. The key is zeroized when the session is dropped.

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::interrupt::Interrupter;
use crate::keystore::{CredentialStore, MasterKey};

const PASSWORD_PROMPT: &str = "Enter the password for the encrypted keystore";

pub struct CredentialStoreSession<'a> {
    store: &'a dyn CredentialStore,
    password_override: Option<Zeroizing<String>>,
    master_key: Option<MasterKey>,
}

impl<'a> CredentialStoreSession<'a> {
    /// `password_override` replaces the interactive prompt when set
    pub fn new(store: &'a dyn CredentialStore, password_override: Option<Zeroizing<String>>) -> Self {
        Self {
            store,
            password_override,
            master_key: None,
        }
    }

    /// Fail with `MissingStore` if the keystore has not been created
    pub async fn ensure_exists(&self) -> Result<()> {
        if self.store.is_initialized().await? {
            Ok(())
        } else {
            Err(Error::MissingStore {
                location: self.store.location(),
            })
        }
    }

    /// Fail with `UnknownSecretInStore` if `name` is not registered
    pub async fn ensure_key_present(&self, name: &str) -> Result<()> {
        let names = self.store.list_registered_names().await?;
        if names.contains(name) {
            Ok(())
        } else {
            Err(Error::UnknownSecretInStore(name.to_string()))
        }
    }

    /// Whether the master key has been derived this run
    pub fn has_master_key(&self) -> bool {
        self.master_key.is_some()
    }

    /// Cached master key, deriving it on first use
    ///
    /// Derivation errors (bad password) are returned as-is and not retried.
    pub async fn master_key(&mut self, interrupter: &dyn Interrupter) -> Result<&MasterKey> {
        let key = match self.master_key.take() {
            Some(key) => key,
            None => {
                let password = match &self.password_override {
                    Some(password) => {
                        debug!("Using keystore password from environment");
                        password.clone()
                    }
                    None => interrupter.request_secret_input(PASSWORD_PROMPT).await?,
                };

                let key = self.store.derive_master_key(&password).await?;
                debug!("Derived keystore master key");
                key
            }
        };

        Ok(self.master_key.insert(key))
    }

    /// Full store path for one secret: existence checks, master key, decrypt
    pub async fn decrypt(
        &mut self,
        name: &str,
        interrupter: &dyn Interrupter,
        verbose: bool,
    ) -> Result<Zeroizing<String>> {
        self.ensure_exists().await?;
        self.ensure_key_present(name).await?;

        if verbose {
            info!("Decrypting keystore secret {}", name);
        }

        // The master key borrows the session mutably
        let store = self.store;
        let master_key = self.master_key(interrupter).await?;
        read_value(store, name, master_key).await
    }
}

/// Decrypt `name` with an already derived master key
async fn read_value(
    store: &dyn CredentialStore,
    name: &str,
    master_key: &MasterKey,
) -> Result<Zeroizing<String>> {
    let value = store.read_value(name, master_key).await?;
    debug!("Read keystore secret {}", name);
    Ok(value)
}
