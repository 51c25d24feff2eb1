//! The crawl engine: shared context, worker pool, and per-URL processing
//!
//! `Crawler::run` seeds the frontier and spawns N identical workers. Each
//! worker loops on `Frontier::next`, drives one URL to a terminal state,
//! and reports it. The pool winds down on its own once the frontier goes
//! quiescent, or early when the frontier is closed by a user interrupt.

use crate::auth::{detect_login_form, AuthHandler, AuthOutcome, CredentialPrompt, CredentialStore, StdinPrompt};
use crate::config::CrawlConfig;
use crate::crawler::{HttpFetcher, PageFetcher, PageMeta};
use crate::download::{suggested_filename, Classifier, DownloadLedger};
use crate::frontier::{Frontier, UrlRecord};
use crate::output::{DiskWriter, FileWriter};
use crate::robots::RobotsCache;
use crate::state::{CrawlStats, CrawlSummary, UrlState};
use crate::url::normalize_url;
use crate::{GrabError, Result};
use chrono::Utc;
use std::sync::Arc;
use url::Url;

/// Everything a worker needs, shared once behind an Arc
struct CrawlContext {
    config: CrawlConfig,
    frontier: Arc<Frontier>,
    robots: RobotsCache,
    ledger: DownloadLedger,
    classifier: Classifier,
    auth: AuthHandler,
    fetcher: Arc<dyn PageFetcher>,
    writer: Arc<dyn FileWriter>,
    stats: CrawlStats,
}

/// Orchestrates one crawl session from seed to summary
pub struct Crawler {
    ctx: Arc<CrawlContext>,
}

impl Crawler {
    /// Builds a crawler with the production collaborators: reqwest
    /// fetcher, local-disk writer, terminal credential prompt
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(
            HttpFetcher::new(&config.user_agent)
                .map_err(|e| GrabError::Config(format!("failed to build HTTP client: {}", e)))?,
        );
        let writer: Arc<dyn FileWriter> = Arc::new(DiskWriter::new(&config.output_dir));
        let prompt: Arc<dyn CredentialPrompt> = Arc::new(StdinPrompt);

        Ok(Self::with_collaborators(config, fetcher, writer, prompt))
    }

    /// Builds a crawler around injected collaborators
    pub fn with_collaborators(
        config: CrawlConfig,
        fetcher: Arc<dyn PageFetcher>,
        writer: Arc<dyn FileWriter>,
        prompt: Arc<dyn CredentialPrompt>,
    ) -> Self {
        let frontier = Arc::new(Frontier::new(config.scope_host(), config.max_depth));
        let robots = RobotsCache::new(fetcher.clone(), &config.user_agent);
        let classifier = Classifier::new(&config.extension);
        let store = Arc::new(CredentialStore::new());
        let auth = AuthHandler::new(fetcher.clone(), prompt, store);

        Self {
            ctx: Arc::new(CrawlContext {
                config,
                frontier,
                robots,
                ledger: DownloadLedger::new(),
                classifier,
                auth,
                fetcher,
                writer,
                stats: CrawlStats::new(),
            }),
        }
    }

    /// Handle for external cancellation; closing it drains the pool
    pub fn frontier(&self) -> Arc<Frontier> {
        self.ctx.frontier.clone()
    }

    /// Runs the crawl to completion and returns the session summary
    pub async fn run(&self) -> CrawlSummary {
        let started = Utc::now();
        let seed = self.ctx.config.seed.clone();
        tracing::info!(
            "Starting crawl of {} for .{} files with {} workers",
            seed,
            self.ctx.config.extension,
            self.ctx.config.workers
        );

        self.ctx.frontier.enqueue(seed.as_str(), 0);

        let mut handles = Vec::with_capacity(self.ctx.config.workers);
        for worker_id in 0..self.ctx.config.workers {
            let ctx = self.ctx.clone();
            handles.push(tokio::spawn(worker_loop(ctx, worker_id)));
        }
        for handle in handles {
            // A worker task only ends by returning; a panic inside one is a
            // bug worth surfacing loudly.
            if let Err(e) = handle.await {
                tracing::error!("Worker task aborted: {}", e);
            }
        }

        let mut summary = self.ctx.stats.snapshot();
        summary.duration_secs = (Utc::now() - started).num_milliseconds() as f64 / 1000.0;
        tracing::info!(
            "Crawl finished: {} pages, {} downloads in {:.1}s",
            summary.fetched,
            summary.downloads,
            summary.duration_secs
        );
        summary
    }
}

async fn worker_loop(ctx: Arc<CrawlContext>, worker_id: usize) {
    tracing::debug!("Worker {} started", worker_id);
    while let Some(record) = ctx.frontier.next().await {
        let state = process_url(&ctx, &record).await;
        tracing::debug!("Worker {}: {} -> {}", worker_id, record.url, state);
        ctx.stats.record_terminal(state);
        ctx.frontier.task_done();
    }
    tracing::debug!("Worker {} exiting", worker_id);
}

/// Upper bound on a robots-declared crawl delay, so a hostile document
/// cannot stall the pool indefinitely
const MAX_CRAWL_DELAY_SECS: f64 = 30.0;

/// Sleeps out the domain's robots crawl-delay hint, if one is declared
///
/// Called before each network transfer for a record. Only the calling
/// worker waits.
async fn apply_crawl_delay(ctx: &CrawlContext, url: &Url) {
    let Some(domain) = crate::url::extract_host(url) else {
        return;
    };
    if let Some(delay) = ctx.robots.crawl_delay(&domain) {
        let secs = delay.clamp(0.0, MAX_CRAWL_DELAY_SECS);
        if secs > 0.0 {
            tracing::trace!("Honoring crawl-delay of {}s for {}", secs, domain);
            tokio::time::sleep(std::time::Duration::from_secs_f64(secs)).await;
        }
    }
}

/// Drives one frontier record to a terminal state
async fn process_url(ctx: &CrawlContext, record: &UrlRecord) -> UrlState {
    if !ctx.robots.is_allowed(&record.url).await {
        tracing::info!("Blocked by robots.txt: {}", record.url);
        return UrlState::SkippedByRobots;
    }

    // Recognizable targets are downloaded directly, never navigated.
    let verdict = ctx.classifier.classify(&record.url, None);
    if verdict.is_target {
        return download(ctx, &record.url, &verdict.dedup_key, None).await;
    }

    // Download endpoints serving some other file type would abort page
    // navigation; skip them without a fetch.
    if ctx.classifier.should_skip_navigation(&record.url) {
        tracing::debug!("Skipping non-target download endpoint: {}", record.url);
        return UrlState::SkippedNonTarget;
    }

    apply_crawl_delay(ctx, &record.url).await;

    let page = match ctx.fetcher.fetch(&record.url).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Fetch failed for {}: {}", record.url, e);
            return UrlState::Failed;
        }
    };

    // Headers can reveal a target the URL alone did not: a redirect to a
    // file, or an extensionless endpoint serving the target content type.
    // The served URL is normalized first so it shares a dedup key with any
    // directly linked sighting of the same artifact.
    let final_url = normalize_url(page.final_url.as_str()).unwrap_or_else(|_| page.final_url.clone());
    let header_verdict = ctx.classifier.classify(&final_url, Some(&page.meta));
    if header_verdict.is_target {
        let preloaded = page.body.as_deref().map(|bytes| (bytes, &page.meta));
        return download(ctx, &final_url, &header_verdict.dedup_key, preloaded).await;
    }

    let mut links = page.links.clone();
    if let Some(form) = detect_login_form(&page.forms) {
        ctx.stats.record_auth_attempt();
        match ctx.auth.negotiate(&record.url, form).await {
            AuthOutcome::Success(post_login) => {
                ctx.stats.record_auth_success();
                // The authenticated page may expose links the public page
                // did not.
                links.extend(post_login.links);
            }
            AuthOutcome::Failed => ctx.stats.record_auth_failure(),
            AuthOutcome::Cancelled => {}
        }
    }

    for link in &links {
        ctx.frontier.enqueue(link, record.depth + 1);
    }

    UrlState::Fetched
}

/// Claims, transfers, and saves one download target
///
/// `preloaded` carries bytes already in hand when the target was
/// discovered by fetching it as a page; otherwise the bytes are fetched
/// here. A failed transfer or save releases the claim so a later sighting
/// can retry.
async fn download(
    ctx: &CrawlContext,
    url: &Url,
    dedup_key: &str,
    preloaded: Option<(&[u8], &PageMeta)>,
) -> UrlState {
    if !ctx.ledger.try_claim(dedup_key) {
        tracing::debug!("Duplicate download skipped: {}", url);
        return UrlState::SkippedDuplicate;
    }

    let (bytes, meta) = match preloaded {
        Some((bytes, meta)) => (bytes.to_vec(), meta.clone()),
        None => {
            apply_crawl_delay(ctx, url).await;
            match ctx.fetcher.fetch_bytes(url).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!("Download failed for {}: {}", url, e);
                    ctx.ledger.release(dedup_key);
                    ctx.stats.record_download_failure();
                    return UrlState::Failed;
                }
            }
        }
    };

    let name = suggested_filename(url, Some(&meta), &ctx.config.extension);
    match ctx.writer.save(&bytes, &name).await {
        Ok(path) => {
            ctx.ledger.complete(dedup_key, path, bytes.len() as u64);
            ctx.stats.record_download();
            UrlState::Fetched
        }
        Err(e) => {
            tracing::warn!("Save failed for {}: {}", url, e);
            ctx.ledger.release(dedup_key);
            ctx.stats.record_download_failure();
            UrlState::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credential, FormDescriptor};
    use crate::crawler::FetchedPage;
    use crate::FetchError;
    use crate::WriteError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::result::Result as StdResult;
    use std::sync::Mutex;

    /// In-memory site graph serving canned pages
    struct StubFetcher {
        pages: HashMap<String, FetchedPage>,
        files: HashMap<String, Vec<u8>>,
        robots: Option<String>,
    }

    impl StubFetcher {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                files: HashMap::new(),
                robots: None,
            }
        }

        fn robots(mut self, content: &str) -> Self {
            self.robots = Some(content.to_string());
            self
        }

        /// A URL whose fetch resolves to a non-HTML response at a possibly
        /// different final URL, as a redirect to a file does
        fn served(mut self, url: &str, final_url: &str, content_type: &str, bytes: &[u8]) -> Self {
            self.pages.insert(
                url.to_string(),
                FetchedPage {
                    status: 200,
                    final_url: Url::parse(final_url).unwrap(),
                    meta: PageMeta {
                        content_type: Some(content_type.to_string()),
                        content_disposition: None,
                    },
                    links: vec![],
                    forms: vec![],
                    body: Some(bytes.to_vec()),
                },
            );
            self
        }

        fn page(mut self, url: &str, links: &[&str]) -> Self {
            let parsed = Url::parse(url).unwrap();
            self.pages.insert(
                url.to_string(),
                FetchedPage {
                    status: 200,
                    final_url: parsed,
                    meta: PageMeta {
                        content_type: Some("text/html".to_string()),
                        content_disposition: None,
                    },
                    links: links.iter().map(|l| l.to_string()).collect(),
                    forms: vec![],
                    body: None,
                },
            );
            self
        }

        fn file(mut self, url: &str, bytes: &[u8]) -> Self {
            self.files.insert(url.to_string(), bytes.to_vec());
            self
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &Url) -> StdResult<FetchedPage, FetchError> {
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| FetchError::Http {
                    url: url.to_string(),
                    status: 404,
                })
        }

        async fn fetch_bytes(&self, url: &Url) -> StdResult<(Vec<u8>, PageMeta), FetchError> {
            self.files
                .get(url.as_str())
                .map(|bytes| (bytes.clone(), PageMeta::default()))
                .ok_or_else(|| FetchError::Http {
                    url: url.to_string(),
                    status: 404,
                })
        }

        async fn submit_form(
            &self,
            page_url: &Url,
            _form: &FormDescriptor,
            _credential: &Credential,
        ) -> StdResult<FetchedPage, FetchError> {
            Err(FetchError::Navigation {
                url: page_url.to_string(),
                message: "no forms in this stub".to_string(),
            })
        }

        async fn fetch_robots(&self, _robots_url: &Url) -> StdResult<Option<String>, FetchError> {
            Ok(self.robots.clone())
        }
    }

    /// Writer recording saves in memory, optionally failing the first few
    #[derive(Default)]
    struct MemoryWriter {
        saves: Mutex<Vec<(String, usize)>>,
        failures_remaining: std::sync::atomic::AtomicUsize,
    }

    impl MemoryWriter {
        fn failing_first(failures: usize) -> Self {
            Self {
                saves: Mutex::new(Vec::new()),
                failures_remaining: std::sync::atomic::AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl FileWriter for MemoryWriter {
        async fn save(&self, bytes: &[u8], suggested_name: &str) -> StdResult<PathBuf, WriteError> {
            let remaining = self
                .failures_remaining
                .load(std::sync::atomic::Ordering::SeqCst);
            if remaining > 0 {
                self.failures_remaining
                    .store(remaining - 1, std::sync::atomic::Ordering::SeqCst);
                return Err(WriteError::Io {
                    path: format!("/mem/{}", suggested_name),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }

            self.saves
                .lock()
                .unwrap()
                .push((suggested_name.to_string(), bytes.len()));
            Ok(PathBuf::from("/mem").join(suggested_name))
        }
    }

    /// Prompt that always declines
    struct NoPrompt;

    #[async_trait]
    impl CredentialPrompt for NoPrompt {
        async fn prompt(&self, _domain: &str, _signature: &str) -> Option<Credential> {
            None
        }
    }

    fn config(workers: usize) -> CrawlConfig {
        CrawlConfig::new(
            "https://site.test/",
            "pdf",
            PathBuf::from("/unused"),
            true,
            workers,
            None,
        )
        .unwrap()
    }

    fn crawler(fetcher: StubFetcher, cfg: CrawlConfig) -> (Crawler, Arc<MemoryWriter>) {
        let writer = Arc::new(MemoryWriter::default());
        let crawler = Crawler::with_collaborators(
            cfg,
            Arc::new(fetcher),
            writer.clone(),
            Arc::new(NoPrompt),
        );
        (crawler, writer)
    }

    #[tokio::test]
    async fn test_crawl_downloads_linked_target() {
        let fetcher = StubFetcher::new()
            .page("https://site.test/", &["https://site.test/about", "https://site.test/a.pdf"])
            .page("https://site.test/about", &[])
            .file("https://site.test/a.pdf", b"%PDF-fake");

        let (crawler, writer) = crawler(fetcher, config(2));
        let summary = crawler.run().await;

        assert_eq!(summary.downloads, 1);
        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.failed, 0);
        let saves = writer.saves.lock().unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0], ("a.pdf".to_string(), 9));
    }

    #[tokio::test]
    async fn test_crawl_terminates_with_many_workers_and_cycles() {
        let fetcher = StubFetcher::new()
            .page("https://site.test/", &["https://site.test/a", "https://site.test/b"])
            .page("https://site.test/a", &["https://site.test/b", "https://site.test/"])
            .page("https://site.test/b", &["https://site.test/a"]);

        let (crawler, _) = crawler(fetcher, config(8));
        let summary = tokio::time::timeout(std::time::Duration::from_secs(5), crawler.run())
            .await
            .expect("crawl must terminate on cycles");

        // Each page fetched exactly once despite the cycle.
        assert_eq!(summary.fetched, 3);
    }

    #[tokio::test]
    async fn test_off_domain_links_not_followed() {
        let fetcher = StubFetcher::new()
            .page("https://site.test/", &["https://elsewhere.test/x.pdf"]);

        let (crawler, writer) = crawler(fetcher, config(1));
        let summary = crawler.run().await;

        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.downloads, 0);
        assert!(writer.saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_contained() {
        let fetcher = StubFetcher::new()
            .page("https://site.test/", &["https://site.test/broken", "https://site.test/ok"])
            .page("https://site.test/ok", &[]);

        let (crawler, _) = crawler(fetcher, config(2));
        let summary = crawler.run().await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.fetched, 2);
    }

    #[tokio::test]
    async fn test_failed_download_releases_claim_and_counts() {
        // Target link present but no file behind it.
        let fetcher = StubFetcher::new()
            .page("https://site.test/", &["https://site.test/gone.pdf"]);

        let (crawler, writer) = crawler(fetcher, config(1));
        let summary = crawler.run().await;

        assert_eq!(summary.download_failures, 1);
        assert_eq!(summary.downloads, 0);
        assert!(writer.saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_served_alias_shares_dedup_key_despite_query_order() {
        // The same artifact is reachable directly and through an alias
        // whose served URL permutes the query; both must collapse to one
        // dedup key, so only the first sighting saves.
        let fetcher = StubFetcher::new()
            .page(
                "https://site.test/",
                &["https://site.test/doc.pdf?a=1&b=2", "https://site.test/alias"],
            )
            .file("https://site.test/doc.pdf?a=1&b=2", b"%PDF-doc")
            .served(
                "https://site.test/alias",
                "https://site.test/doc.pdf?b=2&a=1",
                "application/pdf",
                b"%PDF-doc",
            );

        let (crawler, writer) = crawler(fetcher, config(1));
        let summary = crawler.run().await;

        assert_eq!(summary.downloads, 1);
        assert_eq!(summary.skipped_duplicate, 1);
        assert_eq!(writer.saves.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_target_endpoint_skipped_without_fetch() {
        // A download endpoint for some other file type is never navigated
        // and must not count as a fetched page.
        let fetcher = StubFetcher::new()
            .page("https://site.test/", &["https://site.test/download?name=data.csv"]);

        let (crawler, _) = crawler(fetcher, config(1));
        let summary = crawler.run().await;

        assert_eq!(summary.skipped_non_target, 1);
        assert_eq!(summary.fetched, 1);
        // The stub has no such page; a fetch attempt would have failed.
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_robots_crawl_delay_paces_fetches() {
        let fetcher = StubFetcher::new()
            .robots("User-agent: *\nCrawl-delay: 0.2")
            .page("https://site.test/", &["https://site.test/a"])
            .page("https://site.test/a", &[]);

        let (crawler, _) = crawler(fetcher, config(1));
        let started = std::time::Instant::now();
        let summary = crawler.run().await;

        assert_eq!(summary.fetched, 2);
        // Two page fetches, each preceded by the declared delay.
        assert!(
            started.elapsed() >= std::time::Duration::from_millis(300),
            "crawl-delay was not honored: finished in {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn test_save_failure_releases_claim_for_later_sighting() {
        // Two aliases resolve to the same artifact. The first save fails,
        // which must release the claim so the second sighting can retry.
        let fetcher = StubFetcher::new()
            .page("https://site.test/", &["https://site.test/m1", "https://site.test/m2"])
            .served(
                "https://site.test/m1",
                "https://site.test/doc.pdf",
                "application/pdf",
                b"%PDF-doc",
            )
            .served(
                "https://site.test/m2",
                "https://site.test/doc.pdf",
                "application/pdf",
                b"%PDF-doc",
            );

        let writer = Arc::new(MemoryWriter::failing_first(1));
        let crawler = Crawler::with_collaborators(
            config(1),
            Arc::new(fetcher),
            writer.clone(),
            Arc::new(NoPrompt),
        );
        let summary = crawler.run().await;

        assert_eq!(summary.download_failures, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.downloads, 1);
        assert_eq!(summary.skipped_duplicate, 0);
        let saves = writer.saves.lock().unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].0, "doc.pdf");
    }
}
