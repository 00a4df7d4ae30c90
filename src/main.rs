//! Secrets CLI - resolves project private keys into NeonEVM and Solana wallets
//!
//! # WARNING
//! - Plain-text secrets in .env can leak. Prefer the encrypted keystore.
//! - The keystore password is never stored; losing it means losing the secrets.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

// Use the library crate
use neon_secrets::cli::commands;
use neon_secrets::config::Config;
use neon_secrets::interrupt::TerminalInterrupter;
use neon_secrets::secrets::EnvSource;

/// Resolve and manage project secrets
#[derive(Parser)]
#[command(name = "secrets")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "secrets.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve all secrets and print wallet addresses
    Resolve,

    /// Encrypted keystore management
    Keystore {
        #[command(subcommand)]
        action: KeystoreAction,
    },
}

#[derive(Subcommand)]
enum KeystoreAction {
    /// Store a secret (creates the keystore on first use)
    Set {
        /// Secret name, e.g. PRIVATE_KEY_OWNER
        key: String,

        /// Overwrite an existing value
        #[arg(long)]
        force: bool,
    },

    /// List stored secret names
    List,

    /// Delete a secret
    Delete {
        /// Secret name
        key: String,
    },

    /// Show the project keystore file path
    Path,

    /// Check whether a secret is stored
    Contains {
        /// Secret name
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env; its values act as plaintext overrides
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("neon_secrets=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let interrupter = TerminalInterrupter;

    // Execute command
    let result = match cli.command {
        Commands::Resolve => {
            commands::resolve(&config, Arc::new(EnvSource), Arc::new(interrupter))
                .await
                .map(|_| ())
        }
        Commands::Keystore { action } => match action {
            KeystoreAction::Set { key, force } => {
                commands::keystore_set(&config, &interrupter, &key, force).await
            }
            KeystoreAction::List => commands::keystore_list(&config).await.map(|_| ()),
            KeystoreAction::Delete { key } => {
                commands::keystore_delete(&config, &interrupter, &key).await
            }
            KeystoreAction::Path => commands::keystore_path(&config).await.map(|_| ()),
            KeystoreAction::Contains { key } => {
                commands::keystore_contains(&config, &key).await.map(|_| ())
            }
        },
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
