//! Grabnet: a concurrent file-harvesting web crawler
//!
//! This crate implements a crawler that walks a site from a seed URL,
//! downloads every file matching a target extension, and negotiates login
//! forms it runs into along the way. Crawling respects robots.txt and
//! deduplicates both pages and downloaded artifacts.

pub mod auth;
pub mod config;
pub mod crawler;
pub mod download;
pub mod frontier;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Grabnet operations
#[derive(Debug, Error)]
pub enum GrabError {
    #[error("Invalid seed URL '{seed}': {reason}")]
    InvalidSeed { seed: String, reason: String },

    #[error("Invalid target extension: '{0}'")]
    InvalidExtension(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors produced by the page fetcher collaborator
///
/// These are always contained to the URL that triggered them: the worker
/// logs the failure, marks the record `Failed`, and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Navigation failure for {url}: {message}")]
    Navigation { url: String, message: String },
}

/// Errors produced by the file writer collaborator
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Could not derive a usable filename from: {0}")]
    InvalidFilename(String),
}

/// Result type alias for Grabnet operations
pub type Result<T> = std::result::Result<T, GrabError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use auth::{AuthOutcome, AuthPhase, Credential, CredentialStore};
pub use config::CrawlConfig;
pub use crawler::{Crawler, FetchedPage, PageFetcher, PageMeta};
pub use download::{Classifier, DownloadLedger};
pub use frontier::Frontier;
pub use state::{CrawlStats, CrawlSummary, UrlState};
pub use url::{extract_host, normalize_url};
