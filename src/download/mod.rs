//! Download classification and artifact deduplication
//!
//! The classifier decides whether a URL (optionally backed by response
//! headers) represents a target file; the ledger guarantees at most one
//! successful save per dedup key, no matter how many workers race on the
//! same artifact.

use crate::crawler::PageMeta;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use url::Url;

/// Markers that flag a URL as a site download endpoint even when the
/// target extension is hidden behind an id parameter (WordPress download
/// managers and the like)
const DOWNLOAD_MARKERS: &[&str] = &["download", "wpdmdl", "file"];

/// Secondary indicators accepted alongside a download marker
const ATTACHMENT_MARKERS: &[&str] = &["attachment", "export"];

/// Classification verdict for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the URL/page is a download target
    pub is_target: bool,

    /// Dedup key: the normalized source URL
    pub dedup_key: String,
}

/// Decides whether URLs and responses represent target files
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Lowercase extension without the dot, e.g. "pdf"
    extension: String,

    /// `.pdf` form, precomputed for suffix checks
    dotted: String,
}

impl Classifier {
    pub fn new(extension: &str) -> Self {
        let extension = extension.trim_start_matches('.').to_lowercase();
        let dotted = format!(".{}", extension);
        Self { extension, dotted }
    }

    /// Classifies a URL, consulting response headers when available
    ///
    /// A URL is a target if any of these hold:
    /// 1. its path ends with the target extension;
    /// 2. the response Content-Type names the extension;
    /// 3. the response Content-Disposition is an attachment whose filename
    ///    carries the extension;
    /// 4. it matches the download-endpoint pattern (a download marker in
    ///    the URL together with an extension or attachment indicator).
    pub fn classify(&self, url: &Url, meta: Option<&PageMeta>) -> Verdict {
        let is_target = self.path_matches(url)
            || meta.map(|m| self.meta_matches(m)).unwrap_or(false)
            || self.is_download_endpoint(url);

        Verdict {
            is_target,
            dedup_key: url.as_str().to_string(),
        }
    }

    /// True for download-marker URLs that do NOT carry the target
    /// extension: these endpoints serve some other file type, and
    /// navigating them would either download junk or abort navigation,
    /// so the scheduler skips them without fetching
    pub fn should_skip_navigation(&self, url: &Url) -> bool {
        let lowered = url.as_str().to_lowercase();
        DOWNLOAD_MARKERS.iter().any(|m| lowered.contains(m))
            && !self.classify(url, None).is_target
    }

    fn path_matches(&self, url: &Url) -> bool {
        url.path().to_lowercase().ends_with(&self.dotted)
    }

    fn meta_matches(&self, meta: &PageMeta) -> bool {
        if let Some(content_type) = &meta.content_type {
            let ct = content_type.to_lowercase();
            // "application/pdf", "text/csv; charset=utf-8", ...
            if ct.contains(&self.extension) && !ct.contains("text/html") {
                return true;
            }
        }

        if let Some(disposition) = &meta.content_disposition {
            let cd = disposition.to_lowercase();
            if cd.contains("attachment") && cd.contains(&self.dotted) {
                return true;
            }
        }

        false
    }

    fn is_download_endpoint(&self, url: &Url) -> bool {
        let lowered = url.as_str().to_lowercase();
        let marked = DOWNLOAD_MARKERS.iter().any(|m| lowered.contains(m));
        if !marked {
            return false;
        }

        lowered.contains(&self.dotted)
            || ATTACHMENT_MARKERS.iter().any(|m| lowered.contains(m))
    }
}

/// Evidence that a target file was saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    /// The dedup key the artifact was claimed under
    pub dedup_key: String,

    /// Where the file landed
    pub path: PathBuf,

    /// Saved size in bytes
    pub size: u64,
}

/// Session-local dedup set for downloaded artifacts
///
/// Claims are check-and-insert under one lock, so a key is handed out to
/// exactly one worker. A claim whose transfer or save fails is released,
/// allowing a later sighting of the same artifact to try again; a
/// completed claim is permanent for the session.
#[derive(Debug, Default)]
pub struct DownloadLedger {
    entries: Mutex<HashMap<String, Option<DownloadRecord>>>,
}

impl DownloadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims a dedup key
    ///
    /// Returns false when the key is already claimed; the caller must then
    /// discard the candidate as a duplicate.
    pub fn try_claim(&self, dedup_key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(dedup_key) {
            return false;
        }
        entries.insert(dedup_key.to_string(), None);
        true
    }

    /// Records a completed save for a previously claimed key
    pub fn complete(&self, dedup_key: &str, path: PathBuf, size: u64) {
        let record = DownloadRecord {
            dedup_key: dedup_key.to_string(),
            path,
            size,
        };
        self.entries
            .lock()
            .unwrap()
            .insert(dedup_key.to_string(), Some(record));
    }

    /// Releases a claim whose transfer or save failed
    pub fn release(&self, dedup_key: &str) {
        self.entries.lock().unwrap().remove(dedup_key);
    }

    /// Number of completed downloads
    pub fn completed(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.is_some())
            .count()
    }

    /// Snapshot of all completed download records
    pub fn records(&self) -> Vec<DownloadRecord> {
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter_map(|v| v.clone())
            .collect()
    }
}

/// Derives the filename a saved artifact should get
///
/// Prefers the Content-Disposition filename when the response supplies
/// one, then the last URL path segment; everything is sanitized to a
/// conservative character set.
pub fn suggested_filename(url: &Url, meta: Option<&PageMeta>, extension: &str) -> String {
    if let Some(name) = meta
        .and_then(|m| m.content_disposition.as_deref())
        .and_then(disposition_filename)
    {
        let sanitized = sanitize_filename(&name);
        if !sanitized.is_empty() {
            return sanitized;
        }
    }

    let from_path = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(sanitize_filename)
        .unwrap_or_default();

    if from_path.is_empty() {
        format!("file.{}", extension)
    } else {
        from_path
    }
}

/// Pulls `filename=` out of a Content-Disposition header value
fn disposition_filename(disposition: &str) -> Option<String> {
    disposition.split(';').find_map(|part| {
        let part = part.trim();
        let value = part
            .strip_prefix("filename=")
            .or_else(|| part.strip_prefix("FILENAME="))?;
        let value = value.trim_matches('"').trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })
}

/// Replaces every character outside `[A-Za-z0-9._-]` with an underscore
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}
