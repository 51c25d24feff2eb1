//! Authentication handling: login form negotiation
//!
//! When a worker's page carries a login form, the handler drives a small
//! state machine scoped to that one page: detect the form, obtain
//! credentials (cache first, prompt second), submit, and judge the result.
//! Nothing here locks the crawl globally; two workers hitting independent
//! forms proceed independently, and the shared credential store merely
//! lets the second worker on the *same* form shape skip the prompt.

mod forms;
mod prompt;
mod store;

pub use forms::{detect_login_form, form_signature, FormDescriptor, InputDescriptor};
pub use prompt::{CredentialPrompt, StdinPrompt};
pub use store::{Credential, CredentialStore};

use crate::crawler::{FetchedPage, PageFetcher};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// States of the per-form negotiation
///
/// `NoForm -> FormDetected -> {CredentialsFromCache, CredentialsPrompted}
/// -> Submitted -> {AuthSuccess, AuthFailed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    NoForm,
    FormDetected,
    CredentialsFromCache,
    CredentialsPrompted,
    Submitted,
    AuthSuccess,
    AuthFailed,
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoForm => "no_form",
            Self::FormDetected => "form_detected",
            Self::CredentialsFromCache => "credentials_from_cache",
            Self::CredentialsPrompted => "credentials_prompted",
            Self::Submitted => "submitted",
            Self::AuthSuccess => "auth_success",
            Self::AuthFailed => "auth_failed",
        };
        write!(f, "{}", name)
    }
}

/// Result of negotiating one login form
#[derive(Debug)]
pub enum AuthOutcome {
    /// Submission succeeded; carries the post-login page so its links can
    /// be crawled
    Success(FetchedPage),

    /// Submission errored or the login form re-appeared; the page is
    /// crawled unauthenticated
    Failed,

    /// The user declined to supply credentials; non-fatal
    Cancelled,
}

/// Drives login form negotiation for the worker pool
pub struct AuthHandler {
    fetcher: Arc<dyn PageFetcher>,
    prompt: Arc<dyn CredentialPrompt>,
    store: Arc<CredentialStore>,
}

impl AuthHandler {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        prompt: Arc<dyn CredentialPrompt>,
        store: Arc<CredentialStore>,
    ) -> Self {
        Self {
            fetcher,
            prompt,
            store,
        }
    }

    /// Negotiates one login form found on `page_url`
    ///
    /// Success rule (deterministic, documented): the submission result is
    /// judged successful when the resulting page does NOT contain a form
    /// with the same signature. A re-presented form of the same shape
    /// means the credentials were rejected.
    pub async fn negotiate(&self, page_url: &Url, form: &FormDescriptor) -> AuthOutcome {
        let domain = match crate::url::extract_host(page_url) {
            Some(d) => d,
            None => return AuthOutcome::Failed,
        };
        let signature = form_signature(form);
        tracing::debug!(
            "{}: login form {} on {}",
            AuthPhase::FormDetected,
            signature,
            page_url
        );

        let credential = match self.store.lookup(&domain, &signature) {
            Some(credential) => {
                tracing::debug!("{}: reusing cached credentials", AuthPhase::CredentialsFromCache);
                credential
            }
            None => {
                match self.prompt.prompt(&domain, &signature).await {
                    Some(credential) => {
                        tracing::debug!("{}", AuthPhase::CredentialsPrompted);
                        // Cache before submission so a parallel worker on the
                        // same form shape can already skip its prompt.
                        self.store.store(&domain, &signature, credential.clone());
                        credential
                    }
                    None => {
                        tracing::info!("Credential prompt cancelled for {}", page_url);
                        return AuthOutcome::Cancelled;
                    }
                }
            }
        };

        tracing::debug!("{}: submitting to {}", AuthPhase::Submitted, form.action);
        match self.fetcher.submit_form(page_url, form, &credential).await {
            Ok(result_page) => {
                let form_returned = result_page
                    .forms
                    .iter()
                    .any(|f| form_signature(f) == signature);
                if form_returned {
                    tracing::warn!(
                        "{}: login form re-presented after submit on {}",
                        AuthPhase::AuthFailed,
                        page_url
                    );
                    AuthOutcome::Failed
                } else {
                    tracing::info!("{}: authenticated on {}", AuthPhase::AuthSuccess, domain);
                    AuthOutcome::Success(result_page)
                }
            }
            Err(e) => {
                tracing::warn!("{}: submission failed: {}", AuthPhase::AuthFailed, e);
                AuthOutcome::Failed
            }
        }
    }
}
