//! Crawl configuration and startup validation
//!
//! Configuration arrives entirely from the command line. The only fatal
//! errors in the whole system live here: a seed URL that does not parse or
//! an extension that is empty after trimming aborts before any crawl begins.

use crate::{GrabError, Result};
use std::path::PathBuf;
use url::Url;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("grabnet/", env!("CARGO_PKG_VERSION"));

/// Configuration for a single crawl session
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// The normalized seed URL the crawl starts from
    pub seed: Url,

    /// Target file extension, lowercase, without the leading dot
    pub extension: String,

    /// Directory downloaded files are written into
    pub output_dir: PathBuf,

    /// Restrict crawling to URLs whose host exactly equals the seed host.
    /// Subdomains do not match; "docs.example.com" is a different host
    /// than "example.com".
    pub same_domain_only: bool,

    /// Number of concurrent worker tasks
    pub workers: usize,

    /// Maximum link depth from the seed; None means unbounded
    pub max_depth: Option<u32>,

    /// User agent string for HTTP requests and robots.txt matching
    pub user_agent: String,
}

impl CrawlConfig {
    /// Builds and validates a configuration from raw CLI inputs
    ///
    /// # Errors
    ///
    /// * `GrabError::InvalidSeed` - The seed does not parse as an HTTP(S) URL
    /// * `GrabError::InvalidExtension` - The extension is empty after trimming
    /// * `GrabError::Config` - The worker count is zero
    pub fn new(
        seed: &str,
        extension: &str,
        output_dir: PathBuf,
        same_domain_only: bool,
        workers: usize,
        max_depth: Option<u32>,
    ) -> Result<Self> {
        let seed_url = crate::url::normalize_url(seed).map_err(|e| GrabError::InvalidSeed {
            seed: seed.to_string(),
            reason: e.to_string(),
        })?;

        let extension = extension.trim().trim_start_matches('.').to_lowercase();
        if extension.is_empty() {
            return Err(GrabError::InvalidExtension(extension));
        }

        if workers == 0 {
            return Err(GrabError::Config(
                "worker count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            seed: seed_url,
            extension,
            output_dir,
            same_domain_only,
            workers,
            max_depth,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Returns the host the crawl is scoped to when same-domain filtering
    /// is enabled, or None when the crawl may leave the seed host.
    pub fn scope_host(&self) -> Option<String> {
        if self.same_domain_only {
            crate::url::extract_host(&self.seed)
        } else {
            None
        }
    }
}
