//! URL handling: normalization, host extraction, and scope filtering

mod domain;
mod normalize;

pub use domain::{extract_host, same_host};
pub use normalize::normalize_url;
