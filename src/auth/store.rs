//! In-memory credential cache keyed by (domain, form signature)
//!
//! Pure cache: no I/O, no validation of credential correctness (that is
//! the authentication handler's job after submission). Lives for the
//! process session and is never persisted to disk.

use std::collections::HashMap;
use std::sync::Mutex;

/// Login material for one form shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Username, email, or other identifier
    pub username: String,

    /// The secret; kept out of Display and logs
    pub secret: String,
}

impl Credential {
    pub fn new(username: &str, secret: &str) -> Self {
        Self {
            username: username.to_string(),
            secret: secret.to_string(),
        }
    }
}

/// Shared credential cache
///
/// Writes are keyed insert-or-update only, so concurrent stores for the
/// same key resolve to last-writer-wins without corrupting the map.
#[derive(Debug, Default)]
pub struct CredentialStore {
    entries: Mutex<HashMap<(String, String), Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a credential for a form signature on a domain
    pub fn lookup(&self, domain: &str, signature: &str) -> Option<Credential> {
        self.entries
            .lock()
            .unwrap()
            .get(&(domain.to_string(), signature.to_string()))
            .cloned()
    }

    /// Stores (or replaces) the credential for a form signature on a domain
    pub fn store(&self, domain: &str, signature: &str, credential: Credential) {
        self.entries
            .lock()
            .unwrap()
            .insert((domain.to_string(), signature.to_string()), credential);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
