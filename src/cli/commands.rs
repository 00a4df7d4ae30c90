//! CLI command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::interrupt::{request_new_password, Interrupter};
use crate::keystore::{CredentialStore, FileKeystore};
use crate::secrets::{PlaintextSource, SecretResolver};
use crate::wallet::{materialize, ResolvedWallets};

/// Resolve every configured secret and print the wallet identifiers
pub async fn resolve(
    config: &Config,
    plaintext: Arc<dyn PlaintextSource>,
    interrupter: Arc<dyn Interrupter>,
) -> Result<ResolvedWallets> {
    let catalog = config.secrets.catalog()?;
    let provider = config.network.provider()?;
    let store = Arc::new(FileKeystore::new(config.keystore.file_path()));

    info!(
        "Resolving {} secrets (keystore: {})",
        catalog.len(),
        store.location()
    );

    let resolver = SecretResolver::new(catalog, store, plaintext, interrupter, provider)
        .with_password_key(config.secrets.password_env.clone());

    let wallets = match resolver.resolve().await {
        Ok(wallets) => wallets,
        Err(e) => {
            if matches!(e, Error::PlaintextDenied { .. }) {
                println!(
                    "\nPlease remove plain-text secrets from .env file and store them using the \
                     encrypted keystore instead with the following command:\n\n    secrets keystore set <SECRET_KEY>\n"
                );
            }
            return Err(e.into());
        }
    };

    println!("\n=== Resolved Wallets ===");
    for (short_name, handle) in wallets.iter() {
        println!("  {:<12} {}", short_name, handle.public_id());
    }

    Ok(wallets)
}

/// Store a secret, creating the keystore on first use
pub async fn keystore_set(
    config: &Config,
    interrupter: &dyn Interrupter,
    key: &str,
    force: bool,
) -> Result<()> {
    validate_key_name(key)?;
    let store = FileKeystore::new(config.keystore.file_path());

    let master_key = if store.is_initialized().await? {
        if !force && store.list_registered_names().await?.contains(key) {
            anyhow::bail!(
                "Secret {} is already set. Use --force to overwrite it",
                key
            );
        }
        let password = interrupter
            .request_secret_input("Enter the password for the encrypted keystore")
            .await?;
        store.derive_master_key(&password).await?
    } else {
        println!(
            "No keystore found. Creating a new one at {}",
            store.location()
        );
        let password = request_new_password(interrupter).await?;
        store.initialize(&password).await?
    };

    let value = interrupter
        .request_secret_input(&format!("Enter secret to store for {}", key))
        .await?;
    if value.trim().is_empty() {
        anyhow::bail!("Secret value cannot be empty");
    }

    // Catch typos before they reach the keystore
    let catalog = config.secrets.catalog()?;
    if let Some(entry) = catalog.get(key) {
        let provider = config.network.provider()?;
        materialize(entry, &value, &provider)
            .with_context(|| format!("Refusing to store {}", key))?;
    } else {
        warn!("{} is not part of the secret catalog; storing without validation", key);
    }

    store.set_value(key, value.trim(), &master_key).await?;
    println!("Secret {} stored in {}", key, store.location());
    Ok(())
}

/// List registered secret names
pub async fn keystore_list(config: &Config) -> Result<Vec<String>> {
    let store = FileKeystore::new(config.keystore.file_path());
    ensure_initialized(&store).await?;

    let names: Vec<String> = store.list_registered_names().await?.into_iter().collect();
    if names.is_empty() {
        println!("The keystore does not contain any secrets");
    } else {
        println!("Keys:");
        for name in &names {
            println!("  {}", name);
        }
    }
    Ok(names)
}

/// Delete a secret after verifying the password
pub async fn keystore_delete(config: &Config, interrupter: &dyn Interrupter, key: &str) -> Result<()> {
    let store = FileKeystore::new(config.keystore.file_path());
    ensure_initialized(&store).await?;

    if !store.list_registered_names().await?.contains(key) {
        return Err(Error::UnknownSecretInStore(key.to_string()).into());
    }

    let password = interrupter
        .request_secret_input("Enter the password for the encrypted keystore")
        .await?;
    store.derive_master_key(&password).await?;

    store.remove(key).await?;
    println!("Secret {} deleted", key);
    Ok(())
}

/// Print the project-specific keystore path
pub async fn keystore_path(config: &Config) -> Result<String> {
    let store = FileKeystore::new(config.keystore.file_path());
    ensure_initialized(&store).await?;

    let location = store.location();
    println!("Keystore file path for {}: {}", config.keystore.project, location);
    Ok(location)
}

/// Print whether a secret is registered
pub async fn keystore_contains(config: &Config, key: &str) -> Result<bool> {
    let store = FileKeystore::new(config.keystore.file_path());
    let contains =
        store.is_initialized().await? && store.list_registered_names().await?.contains(key);

    println!("{}", contains);
    Ok(contains)
}

async fn ensure_initialized(store: &FileKeystore) -> Result<()> {
    if !store.is_initialized().await? {
        return Err(Error::MissingStore {
            location: store.location(),
        }
        .into());
    }
    Ok(())
}

/// Keystore keys: letters, digits and underscores, not starting with a digit
fn validate_key_name(key: &str) -> Result<()> {
    let valid = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid {
        anyhow::bail!(
            "Invalid key name {:?}: use letters, digits and underscores, not starting with a digit",
            key
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;
    use crate::keystore::KdfParams;
    use crate::test_support::ScriptedInterrupter;

    const OWNER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const OWNER_ADDR: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.keystore.directory = dir.to_path_buf();
        config.keystore.project = "test".into();
        config.secrets.names = vec!["PRIVATE_KEY_OWNER".into()];
        config
    }

    // Seed a keystore with cheap KDF parameters so tests stay fast
    async fn seed(config: &Config, password: &str, values: &[(&str, &str)]) {
        let store = FileKeystore::new(config.keystore.file_path()).with_kdf_params(KdfParams {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        });
        let key = store.initialize(password).await.unwrap();
        for (name, value) in values {
            store.set_value(name, value, &key).await.unwrap();
        }
    }

    #[test]
    fn test_key_name_validation() {
        assert!(validate_key_name("PRIVATE_KEY_OWNER").is_ok());
        assert!(validate_key_name("_api_key2").is_ok());
        assert!(validate_key_name("").is_err());
        assert!(validate_key_name("2FA").is_err());
        assert!(validate_key_name("MY-KEY").is_err());
    }

    #[tokio::test]
    async fn test_resolve_from_file_keystore() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        seed(&config, "pw", &[("PRIVATE_KEY_OWNER", OWNER_KEY)]).await;

        let wallets = resolve(
            &config,
            Arc::new(HashMap::<String, String>::new()),
            Arc::new(ScriptedInterrupter::new(&[], &["pw"])),
        )
        .await
        .unwrap();

        assert_eq!(wallets.evm("owner").unwrap().address(), OWNER_ADDR);
    }

    #[tokio::test]
    async fn test_set_refuses_invalid_catalog_value() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        seed(&config, "pw", &[]).await;

        let interrupter = ScriptedInterrupter::new(&[], &["pw", "0xnot-a-key"]);
        assert!(keystore_set(&config, &interrupter, "PRIVATE_KEY_OWNER", false)
            .await
            .is_err());
        assert!(!keystore_contains(&config, "PRIVATE_KEY_OWNER").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_requires_force_to_overwrite() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        seed(&config, "pw", &[("PRIVATE_KEY_OWNER", OWNER_KEY)]).await;

        let interrupter = ScriptedInterrupter::new(&[], &["pw", OWNER_KEY]);
        assert!(keystore_set(&config, &interrupter, "PRIVATE_KEY_OWNER", false)
            .await
            .is_err());
        // Refused before any prompt
        assert_eq!(interrupter.secret_calls(), 0);

        keystore_set(&config, &interrupter, "PRIVATE_KEY_OWNER", true)
            .await
            .unwrap();
        assert_eq!(interrupter.secret_calls(), 2);
    }

    #[tokio::test]
    async fn test_list_delete_and_path() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());

        assert!(keystore_list(&config).await.is_err());
        assert!(keystore_path(&config).await.is_err());
        assert!(!keystore_contains(&config, "PRIVATE_KEY_OWNER").await.unwrap());

        seed(
            &config,
            "pw",
            &[("PRIVATE_KEY_OWNER", OWNER_KEY), ("API_TOKEN", "t")],
        )
        .await;

        assert_eq!(
            keystore_list(&config).await.unwrap(),
            vec!["API_TOKEN", "PRIVATE_KEY_OWNER"]
        );
        assert!(keystore_path(&config)
            .await
            .unwrap()
            .ends_with("test-keystore.json"));

        let wrong = ScriptedInterrupter::new(&[], &["nope"]);
        assert!(keystore_delete(&config, &wrong, "API_TOKEN").await.is_err());
        assert!(keystore_contains(&config, "API_TOKEN").await.unwrap());

        let right = ScriptedInterrupter::new(&[], &["pw"]);
        keystore_delete(&config, &right, "API_TOKEN").await.unwrap();
        assert!(!keystore_contains(&config, "API_TOKEN").await.unwrap());

        let unused = ScriptedInterrupter::new(&[], &[]);
        assert!(keystore_delete(&config, &unused, "API_TOKEN").await.is_err());
    }
}
