//! Artifact persistence and end-of-run reporting

use crate::state::CrawlSummary;
use crate::WriteError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Sink for downloaded artifacts
///
/// Abstracted so the crawl pipeline can be exercised without touching the
/// filesystem.
#[async_trait]
pub trait FileWriter: Send + Sync {
    /// Persists one artifact under (a collision-free variant of) the
    /// suggested name and returns the final path
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf, WriteError>;
}

/// Writes artifacts to a local directory
///
/// The directory is created on first save. Name collisions get a numeric
/// suffix before the extension, so `report.pdf` is followed by
/// `report-1.pdf`, `report-2.pdf` and so on.
pub struct DiskWriter {
    output_dir: PathBuf,
}

impl DiskWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Finds a path under the output directory that does not yet exist
    async fn available_path(&self, suggested_name: &str) -> PathBuf {
        let candidate = self.output_dir.join(suggested_name);
        if tokio::fs::try_exists(&candidate).await.ok() != Some(true) {
            return candidate;
        }

        let (stem, extension) = split_name(suggested_name);
        for n in 1.. {
            let name = if extension.is_empty() {
                format!("{}-{}", stem, n)
            } else {
                format!("{}-{}.{}", stem, n, extension)
            };
            let candidate = self.output_dir.join(name);
            if tokio::fs::try_exists(&candidate).await.ok() != Some(true) {
                return candidate;
            }
        }
        unreachable!()
    }
}

#[async_trait]
impl FileWriter for DiskWriter {
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf, WriteError> {
        if suggested_name.is_empty() || suggested_name == "." || suggested_name == ".." {
            return Err(WriteError::InvalidFilename(suggested_name.to_string()));
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| WriteError::Io {
                path: self.output_dir.display().to_string(),
                source,
            })?;

        let path = self.available_path(suggested_name).await;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| WriteError::Io {
                path: path.display().to_string(),
                source,
            })?;

        tracing::info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

/// Splits a filename into (stem, extension) without touching dot-prefixed
/// names like `.hidden`
fn split_name(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (name, ""),
    }
}

/// Prints the end-of-run summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("\n=== Crawl Summary ===");
    println!("Duration:            {:.1}s", summary.duration_secs);
    println!("Pages fetched:       {}", summary.fetched);
    println!("Fetch failures:      {}", summary.failed);
    println!("Blocked by robots:   {}", summary.skipped_robots);
    println!("Duplicates skipped:  {}", summary.skipped_duplicate);
    println!("Endpoints skipped:   {}", summary.skipped_non_target);
    println!("Files downloaded:    {}", summary.downloads);
    println!("Download failures:   {}", summary.download_failures);
    if summary.auth_attempts > 0 {
        println!(
            "Logins:              {} attempted, {} succeeded, {} failed",
            summary.auth_attempts, summary.auth_successes, summary.auth_failures
        );
    }
    println!("=====================");
}
