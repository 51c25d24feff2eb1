//! URL lifecycle states and session-wide crawl counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Represents the current state of a URL record in the crawl
///
/// Transitions are driven exclusively by the scheduler:
/// `Discovered -> Queued -> InFlight -> {Fetched, Failed, SkippedByRobots,
/// SkippedDuplicate}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    // ===== Active states =====
    /// URL extracted from a page or supplied as the seed, not yet admitted
    Discovered,

    /// URL admitted to the frontier and waiting for a worker
    Queued,

    /// A worker is currently processing the URL
    InFlight,

    // ===== Terminal states =====
    /// URL was fetched and fully processed (including target downloads)
    Fetched,

    /// Fetch, download, or save failed; no retry
    Failed,

    /// robots.txt disallowed the URL
    SkippedByRobots,

    /// The download dedup key was already claimed
    SkippedDuplicate,

    /// Download-endpoint URL serving a non-target file type; never fetched
    SkippedNonTarget,
}

impl UrlState {
    /// Returns true if this is a terminal state (no further processing)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Discovered | Self::Queued | Self::InFlight)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Queued => "queued",
            Self::InFlight => "in_flight",
            Self::Fetched => "fetched",
            Self::Failed => "failed",
            Self::SkippedByRobots => "skipped_by_robots",
            Self::SkippedDuplicate => "skipped_duplicate",
            Self::SkippedNonTarget => "skipped_non_target",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared, lock-free counters updated by workers as records reach
/// terminal states
///
/// One instance is shared by every worker; snapshot() produces the final
/// user-visible summary.
#[derive(Debug, Default)]
pub struct CrawlStats {
    fetched: AtomicU64,
    failed: AtomicU64,
    skipped_robots: AtomicU64,
    skipped_duplicate: AtomicU64,
    skipped_non_target: AtomicU64,
    downloads: AtomicU64,
    download_failures: AtomicU64,
    auth_attempts: AtomicU64,
    auth_successes: AtomicU64,
    auth_failures: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a URL reaching a terminal state
    ///
    /// Non-terminal states are ignored; they are bookkeeping internal to
    /// the frontier and workers.
    pub fn record_terminal(&self, state: UrlState) {
        match state {
            UrlState::Fetched => self.fetched.fetch_add(1, Ordering::Relaxed),
            UrlState::Failed => self.failed.fetch_add(1, Ordering::Relaxed),
            UrlState::SkippedByRobots => self.skipped_robots.fetch_add(1, Ordering::Relaxed),
            UrlState::SkippedDuplicate => self.skipped_duplicate.fetch_add(1, Ordering::Relaxed),
            UrlState::SkippedNonTarget => self.skipped_non_target.fetch_add(1, Ordering::Relaxed),
            _ => return,
        };
    }

    pub fn record_download(&self) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_download_failure(&self) {
        self.download_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_attempt(&self) {
        self.auth_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_success(&self) {
        self.auth_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> CrawlSummary {
        CrawlSummary {
            fetched: self.fetched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped_robots: self.skipped_robots.load(Ordering::Relaxed),
            skipped_duplicate: self.skipped_duplicate.load(Ordering::Relaxed),
            skipped_non_target: self.skipped_non_target.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            download_failures: self.download_failures.load(Ordering::Relaxed),
            auth_attempts: self.auth_attempts.load(Ordering::Relaxed),
            auth_successes: self.auth_successes.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            duration_secs: 0.0,
        }
    }
}

/// Final user-visible summary of a crawl session
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSummary {
    /// URLs fetched and fully processed
    pub fetched: u64,

    /// URLs whose fetch, download, or save failed
    pub failed: u64,

    /// URLs disallowed by robots.txt
    pub skipped_robots: u64,

    /// Download candidates discarded because their dedup key was claimed
    pub skipped_duplicate: u64,

    /// Download-endpoint URLs skipped without a fetch (non-target type)
    pub skipped_non_target: u64,

    /// Files successfully saved
    pub downloads: u64,

    /// Downloads that were claimed but failed to transfer or save
    pub download_failures: u64,

    /// Login forms the crawler attempted to negotiate
    pub auth_attempts: u64,

    /// Attempts judged successful by the post-submit heuristic
    pub auth_successes: u64,

    /// Attempts judged failed (or whose submission errored)
    pub auth_failures: u64,

    /// Wall-clock duration of the crawl in seconds
    pub duration_secs: f64,
}

impl CrawlSummary {
    /// Total URLs that reached a terminal state
    pub fn total_urls(&self) -> u64 {
        self.fetched
            + self.failed
            + self.skipped_robots
            + self.skipped_duplicate
            + self.skipped_non_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!UrlState::Discovered.is_terminal());
        assert!(!UrlState::Queued.is_terminal());
        assert!(!UrlState::InFlight.is_terminal());

        assert!(UrlState::Fetched.is_terminal());
        assert!(UrlState::Failed.is_terminal());
        assert!(UrlState::SkippedByRobots.is_terminal());
        assert!(UrlState::SkippedDuplicate.is_terminal());
        assert!(UrlState::SkippedNonTarget.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", UrlState::Fetched), "fetched");
        assert_eq!(format!("{}", UrlState::SkippedByRobots), "skipped_by_robots");
    }

    #[test]
    fn test_record_terminal_counts() {
        let stats = CrawlStats::new();
        stats.record_terminal(UrlState::Fetched);
        stats.record_terminal(UrlState::Fetched);
        stats.record_terminal(UrlState::Failed);
        stats.record_terminal(UrlState::SkippedByRobots);
        stats.record_terminal(UrlState::SkippedDuplicate);
        stats.record_terminal(UrlState::SkippedNonTarget);

        let summary = stats.snapshot();
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped_robots, 1);
        assert_eq!(summary.skipped_duplicate, 1);
        assert_eq!(summary.skipped_non_target, 1);
        assert_eq!(summary.total_urls(), 6);
    }

    #[test]
    fn test_non_terminal_states_ignored() {
        let stats = CrawlStats::new();
        stats.record_terminal(UrlState::Discovered);
        stats.record_terminal(UrlState::Queued);
        stats.record_terminal(UrlState::InFlight);

        assert_eq!(stats.snapshot().total_urls(), 0);
    }

    #[test]
    fn test_auth_and_download_counters() {
        let stats = CrawlStats::new();
        stats.record_download();
        stats.record_download_failure();
        stats.record_auth_attempt();
        stats.record_auth_success();

        let summary = stats.snapshot();
        assert_eq!(summary.downloads, 1);
        assert_eq!(summary.download_failures, 1);
        assert_eq!(summary.auth_attempts, 1);
        assert_eq!(summary.auth_successes, 1);
        assert_eq!(summary.auth_failures, 0);
    }
}
