//! Plaintext overrides and the consent gate
//!
//! Secrets may be supplied in plain text (typically a `.env` file loaded
//! into the environment). Using them requires one explicit confirmation
//! per run, covering every plaintext secret found.

use std::collections::HashMap;

use tracing::warn;
use zeroize::Zeroizing;

use crate::error::Result;
use crate::interrupt::Interrupter;

use super::catalog::SecretCatalog;

/// Read-only name → value overrides
pub trait PlaintextSource: Send + Sync {
    /// Raw value for `name`, if set
    fn get(&self, name: &str) -> Option<String>;

    /// Value for `name` if set and non-empty
    fn lookup(&self, name: &str) -> Option<Zeroizing<String>> {
        self.get(name)
            .filter(|v| !v.is_empty())
            .map(Zeroizing::new)
    }

    /// Whether `name` has a non-empty value
    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

/// Process environment (after `.env` has been loaded with dotenvy)
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSource;

impl PlaintextSource for EnvSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl PlaintextSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Outcome of the consent gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentDecision {
    /// Catalog names with a plaintext value, in catalog order
    pub found: Vec<String>,
    /// Whether plaintext values may be used this run
    pub granted: bool,
}

impl ConsentDecision {
    /// The user was asked and declined
    pub fn denied(&self) -> bool {
        !self.found.is_empty() && !self.granted
    }
}

/// Scan the plaintext source and, if any catalog secret is present, ask once
/// whether to use plaintext secrets for the whole run.
///
/// Nothing found means no prompt and `granted = false`.
pub async fn evaluate_consent(
    catalog: &SecretCatalog,
    source: &dyn PlaintextSource,
    interrupter: &dyn Interrupter,
) -> Result<ConsentDecision> {
    let found: Vec<String> = catalog
        .iter()
        .filter(|entry| source.contains(entry.catalog_name()))
        .map(|entry| entry.catalog_name().to_string())
        .collect();

    if found.is_empty() {
        return Ok(ConsentDecision {
            found,
            granted: false,
        });
    }

    warn!("Plain-text secrets found in .env file: {}", found.join(", "));

    let answer = interrupter
        .request_input(&consent_prompt(&found), "y/n")
        .await?;
    let granted = is_affirmative(&answer);

    if !granted {
        warn!("User denied using plain-text secrets");
    }

    Ok(ConsentDecision { found, granted })
}

fn consent_prompt(found: &[String]) -> String {
    format!(
        "The following plain-text secrets have been found in .env file: {}.\n\n\
         Storing secrets in .env file involves the risk of leaking secret values. \
         It is recommended to store secrets using the encrypted keystore instead.\n\n\
         Would you like to continue using plain-text secrets found in .env file?",
        found.join(", ")
    )
}

fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}
