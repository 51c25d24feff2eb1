//! Per-domain robots policy cache
//!
//! Policies are fetched lazily on the first URL seen for a domain and then
//! reused for the whole session; a policy is never re-fetched mid-run. If
//! two workers race on an unfetched domain both may fetch; the second
//! result overwrites the first, which is harmless since both derive from
//! the same document.

use crate::crawler::PageFetcher;
use crate::robots::ParsedRobots;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

/// Cached robots.txt decision surface for one domain
///
/// Immutable after creation for the session.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    /// The domain this policy covers
    pub domain: String,

    /// When the robots document was fetched (or the fallback recorded)
    pub fetched_at: DateTime<Utc>,

    /// Parsed rule set, or the allow-all fallback
    pub rules: ParsedRobots,

    /// Crawl-delay hint in seconds, if the document declared one
    pub crawl_delay: Option<f64>,
}

impl DomainPolicy {
    fn new(domain: &str, rules: ParsedRobots, user_agent: &str) -> Self {
        let crawl_delay = rules.crawl_delay(user_agent);
        Self {
            domain: domain.to_string(),
            fetched_at: Utc::now(),
            rules,
            crawl_delay,
        }
    }
}

/// Session-wide robots policy engine
///
/// Shared by all workers; the internal lock covers only map access, never
/// the fetch itself, so a slow robots fetch stalls one worker, not the
/// cache.
pub struct RobotsCache {
    fetcher: Arc<dyn PageFetcher>,
    user_agent: String,
    policies: Mutex<HashMap<String, Arc<DomainPolicy>>>,
}

impl RobotsCache {
    pub fn new(fetcher: Arc<dyn PageFetcher>, user_agent: &str) -> Self {
        Self {
            fetcher,
            user_agent: user_agent.to_string(),
            policies: Mutex::new(HashMap::new()),
        }
    }

    /// Answers allow/deny for a candidate URL, fetching the domain's
    /// policy on first contact
    ///
    /// Crawling never halts on robots problems: an unreachable or
    /// errored robots.txt yields the permissive allow-all policy.
    pub async fn is_allowed(&self, url: &Url) -> bool {
        let domain = match crate::url::extract_host(url) {
            Some(d) => d,
            None => return true,
        };

        let policy = match self.cached(&domain) {
            Some(policy) => policy,
            None => self.fetch_policy(url, &domain).await,
        };

        policy.rules.is_allowed(url.as_str(), &self.user_agent)
    }

    /// Returns the crawl-delay hint for a domain, if its policy has been
    /// fetched and declares one
    pub fn crawl_delay(&self, domain: &str) -> Option<f64> {
        self.cached(domain).and_then(|p| p.crawl_delay)
    }

    fn cached(&self, domain: &str) -> Option<Arc<DomainPolicy>> {
        self.policies.lock().unwrap().get(domain).cloned()
    }

    async fn fetch_policy(&self, url: &Url, domain: &str) -> Arc<DomainPolicy> {
        let rules = match self.fetcher.fetch_robots(&robots_url(url)).await {
            Ok(Some(content)) => {
                tracing::debug!("Fetched robots.txt for {}", domain);
                ParsedRobots::from_content(&content)
            }
            Ok(None) => {
                tracing::debug!("No robots.txt served by {}, allowing all", domain);
                ParsedRobots::allow_all()
            }
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}, allowing all", domain, e);
                ParsedRobots::allow_all()
            }
        };

        let policy = Arc::new(DomainPolicy::new(domain, rules, &self.user_agent));

        // Last writer wins on a concurrent double fetch.
        self.policies
            .lock()
            .unwrap()
            .insert(domain.to_string(), policy.clone());

        policy
    }

    #[cfg(test)]
    pub fn cached_domains(&self) -> usize {
        self.policies.lock().unwrap().len()
    }
}

/// Builds the robots.txt URL for the host of the given URL
fn robots_url(url: &Url) -> Url {
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    robots
}
