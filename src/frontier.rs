//! Thread-safe URL frontier with dedup-on-enqueue and quiescence detection
//!
//! The frontier is the shared work queue for the worker pool. It owns the
//! normalized-URL seen set, so `enqueue` admits each normalized URL at most
//! once for the whole session. `next` suspends while the queue is empty but
//! work is still in flight, and resolves to `None` only once the crawl is
//! quiescent: queue drained and zero in-flight tasks. That check is the
//! pool's termination condition.

use crate::url::{normalize_url, same_host};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::Notify;
use url::Url;

/// A URL admitted to the frontier
#[derive(Debug, Clone)]
pub struct UrlRecord {
    /// The normalized URL
    pub url: Url,

    /// Link depth from the seed (seed is depth 0)
    pub depth: u32,
}

#[derive(Debug)]
struct FrontierInner {
    queue: VecDeque<UrlRecord>,
    /// Normalized forms of every URL ever admitted
    seen: HashSet<String>,
    /// Records dequeued but not yet marked done
    in_flight: usize,
    closed: bool,
}

/// Shared frontier queue
///
/// All mutation happens under one internal lock held only for queue and
/// set operations; workers park on a `Notify` while the queue is empty.
#[derive(Debug)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    notify: Notify,
    /// Exact-host scope filter; None disables same-domain filtering
    scope_host: Option<String>,
    /// Maximum admitted depth; None means unbounded
    max_depth: Option<u32>,
}

impl Frontier {
    pub fn new(scope_host: Option<String>, max_depth: Option<u32>) -> Self {
        Self {
            inner: Mutex::new(FrontierInner {
                queue: VecDeque::new(),
                seen: HashSet::new(),
                in_flight: 0,
                closed: false,
            }),
            notify: Notify::new(),
            scope_host,
            max_depth,
        }
    }

    /// Offers a URL to the frontier
    ///
    /// Returns true only when the URL was newly admitted. Rejections:
    /// normalization failure, out-of-scope host, depth past the limit, a
    /// normalized form already seen, or a closed frontier.
    pub fn enqueue(&self, raw: &str, depth: u32) -> bool {
        let url = match normalize_url(raw) {
            Ok(u) => u,
            Err(e) => {
                tracing::debug!("Rejecting unparseable URL {}: {}", raw, e);
                return false;
            }
        };

        if let Some(scope) = &self.scope_host {
            if !same_host(&url, scope) {
                tracing::trace!("Rejecting out-of-scope URL {}", url);
                return false;
            }
        }

        if let Some(max) = self.max_depth {
            if depth > max {
                tracing::trace!("Rejecting URL {} past depth limit {}", url, max);
                return false;
            }
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return false;
        }
        if !inner.seen.insert(url.as_str().to_string()) {
            return false;
        }
        inner.queue.push_back(UrlRecord { url, depth });
        drop(inner);

        self.notify.notify_waiters();
        true
    }

    /// Pops the next URL, suspending while the queue is empty but work is
    /// still in flight
    ///
    /// Returns `None` when the frontier is quiescent (drained and idle) or
    /// has been closed. A returned record counts as in-flight until the
    /// caller invokes [`Frontier::task_done`].
    pub async fn next(&self) -> Option<UrlRecord> {
        loop {
            // Register for wakeups before checking state, so a notify that
            // lands between the check and the await is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(record) = inner.queue.pop_front() {
                    inner.in_flight += 1;
                    return Some(record);
                }
                if inner.closed || inner.in_flight == 0 {
                    drop(inner);
                    // Release every other parked worker so the pool drains.
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks one dequeued record as terminal
    ///
    /// Must be called exactly once per record returned by [`Frontier::next`].
    pub fn task_done(&self) {
        let mut inner = self.inner.lock().unwrap();
        debug_assert!(inner.in_flight > 0, "task_done without matching next");
        inner.in_flight = inner.in_flight.saturating_sub(1);
        let quiescent = inner.queue.is_empty() && inner.in_flight == 0;
        drop(inner);

        if quiescent {
            self.notify.notify_waiters();
        }
    }

    /// Closes the frontier: pending and future dequeues resolve to `None`
    /// and enqueues are rejected
    ///
    /// Used for external cancellation (user interrupt). Workers finish or
    /// abandon their current record and exit on their next dequeue.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        inner.queue.clear();
        drop(inner);

        self.notify.notify_waiters();
    }

    /// Number of URLs waiting in the queue
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().queue.is_empty()
    }

    /// Number of dequeued records not yet marked done
    pub fn in_flight(&self) -> usize {
        self.inner.lock().unwrap().in_flight
    }
}
