//! Credential prompt collaborator
//!
//! Prompting is a blocking interaction with the user, modeled as an
//! injected capability so tests can swap in scripted stubs. A prompt
//! blocks only the worker that triggered it; the rest of the pool keeps
//! crawling.

use crate::auth::Credential;
use async_trait::async_trait;
use std::io::{BufRead, Write};

/// External collaborator that obtains credentials from the user
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// Asks for credentials for a login form
    ///
    /// Returns None when the user cancels; the handler then abandons
    /// authentication for that page and the crawl continues
    /// unauthenticated.
    async fn prompt(&self, domain: &str, signature: &str) -> Option<Credential>;
}

/// Interactive prompt reading from the terminal
#[derive(Debug, Default)]
pub struct StdinPrompt;

#[async_trait]
impl CredentialPrompt for StdinPrompt {
    async fn prompt(&self, domain: &str, signature: &str) -> Option<Credential> {
        let domain = domain.to_string();
        let signature = signature.to_string();

        // Terminal I/O would stall the runtime; push it onto the blocking
        // pool so only this worker waits.
        tokio::task::spawn_blocking(move || read_credentials(&domain, &signature))
            .await
            .ok()
            .flatten()
    }
}

fn read_credentials(domain: &str, signature: &str) -> Option<Credential> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!(
        "\nLogin form encountered on {} (form {}). Leave username empty to skip.",
        domain, signature
    );

    print!("Username: ");
    stdout.flush().ok()?;
    let mut username = String::new();
    stdin.lock().read_line(&mut username).ok()?;
    let username = username.trim();
    if username.is_empty() {
        return None;
    }

    print!("Password: ");
    stdout.flush().ok()?;
    let mut secret = String::new();
    stdin.lock().read_line(&mut secret).ok()?;

    Some(Credential::new(
        username,
        secret.trim_end_matches(|c| c == '\r' || c == '\n'),
    ))
}
