//! Interactive prompts
//!
//! Resolution suspends on the user only through [`Interrupter`], so tests
//! can script answers and the binary can use the terminal.

use async_trait::async_trait;
use dialoguer::{Input, Password};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Source of interactive user input
#[async_trait]
pub trait Interrupter: Send + Sync {
    /// Ask a visible question; `hint` describes the expected answer (`y/n`)
    async fn request_input(&self, prompt: &str, hint: &str) -> Result<String>;

    /// Ask for a secret without echo; the answer must never be logged
    async fn request_secret_input(&self, prompt: &str) -> Result<Zeroizing<String>>;
}

/// Terminal prompts via dialoguer
///
/// Blocks the calling task until the user answers; there is no timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalInterrupter;

#[async_trait]
impl Interrupter for TerminalInterrupter {
    async fn request_input(&self, prompt: &str, hint: &str) -> Result<String> {
        let answer = Input::<String>::new()
            .with_prompt(format!("{} ({})", prompt, hint))
            .allow_empty(true)
            .interact_text()?;
        Ok(answer)
    }

    async fn request_secret_input(&self, prompt: &str) -> Result<Zeroizing<String>> {
        let answer = Password::new().with_prompt(prompt).interact()?;
        Ok(Zeroizing::new(answer))
    }
}

/// Ask for a new password twice and require both entries to match
pub async fn request_new_password(interrupter: &dyn Interrupter) -> Result<Zeroizing<String>> {
    let password = interrupter
        .request_secret_input("Enter a password for the new keystore")
        .await?;
    if password.is_empty() {
        return Err(Error::Prompt("Password cannot be empty".into()));
    }

    let confirmation = interrupter.request_secret_input("Confirm password").await?;
    if *password != *confirmation {
        return Err(Error::Prompt("Passwords do not match".into()));
    }

    Ok(password)
}
