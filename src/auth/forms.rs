//! Login form detection and signature computation
//!
//! Detection is a pure classification over the structured form summary the
//! parser produces, so it works identically against the real fetcher and
//! the test stubs. The signature is the credential cache key: two forms
//! with the same action path and the same ordered field shape are "the
//! same form" wherever they appear on a domain.

use crate::auth::Credential;
use sha2::{Digest, Sha256};
use url::Url;

/// One `<input>` element inside a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescriptor {
    /// The input's name attribute; empty when absent
    pub name: String,

    /// The input's type attribute, lowercase; "text" when absent
    pub input_type: String,

    /// Pre-filled value attribute (hidden fields, CSRF tokens)
    pub value: Option<String>,
}

impl InputDescriptor {
    pub fn new(name: &str, input_type: &str, value: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            input_type: input_type.to_lowercase(),
            value: value.map(|v| v.to_string()),
        }
    }

    fn is_password(&self) -> bool {
        self.input_type == "password"
    }

    /// True for inputs that can carry the user identifier
    fn is_identifier(&self) -> bool {
        !self.name.is_empty() && matches!(self.input_type.as_str(), "text" | "email" | "tel")
    }
}

/// A form found on a page, summarized for classification and submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDescriptor {
    /// Resolved absolute submission target
    pub action: String,

    /// Submission method, lowercase
    pub method: String,

    /// Inputs in document order
    pub inputs: Vec<InputDescriptor>,
}

impl FormDescriptor {
    /// True when this form shape matches the login heuristic: one password
    /// input plus at least one identifier input within the same form
    pub fn is_login_form(&self) -> bool {
        self.inputs.iter().any(InputDescriptor::is_password)
            && self.inputs.iter().any(InputDescriptor::is_identifier)
    }

    /// Name of the identifier field credentials go into (first identifier
    /// input in document order)
    pub fn identifier_field(&self) -> Option<&str> {
        self.inputs
            .iter()
            .find(|i| i.is_identifier())
            .map(|i| i.name.as_str())
    }

    /// Name of the password field
    pub fn password_field(&self) -> Option<&str> {
        self.inputs
            .iter()
            .find(|i| i.is_password())
            .map(|i| i.name.as_str())
    }

    /// Produces the submission parameter list: credentials in the
    /// identifier/password fields, pre-filled values (hidden fields, CSRF
    /// tokens) passed through unchanged
    pub fn fill(&self, credential: &Credential) -> Vec<(String, String)> {
        let identifier_field = self.identifier_field();
        let password_field = self.password_field();

        self.inputs
            .iter()
            .filter(|input| !input.name.is_empty())
            .map(|input| {
                let value = if Some(input.name.as_str()) == password_field {
                    credential.secret.clone()
                } else if Some(input.name.as_str()) == identifier_field {
                    credential.username.clone()
                } else {
                    input.value.clone().unwrap_or_default()
                };
                (input.name.clone(), value)
            })
            .collect()
    }
}

/// Finds the first login form on a page, if any
pub fn detect_login_form(forms: &[FormDescriptor]) -> Option<&FormDescriptor> {
    forms.iter().find(|f| f.is_login_form())
}

/// Computes the stable fingerprint of a form shape
///
/// Hashes the action path (query and host excluded, so the same form
/// reached via different hosts or tracking queries matches) together with
/// the ordered `name:type` list of its inputs. Truncated hex is plenty for
/// a session-local cache key.
pub fn form_signature(form: &FormDescriptor) -> String {
    let action_path = Url::parse(&form.action)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| form.action.clone());

    let mut hasher = Sha256::new();
    hasher.update(action_path.as_bytes());
    for input in &form.inputs {
        hasher.update(b"|");
        hasher.update(input.name.as_bytes());
        hasher.update(b":");
        hasher.update(input.input_type.as_bytes());
    }

    hex::encode(&hasher.finalize()[..8])
}
