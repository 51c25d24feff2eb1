//! Crawl engine: fetching, page parsing, and the worker pool

mod fetcher;
mod parser;
mod worker;

pub use fetcher::{FetchedPage, HttpFetcher, PageFetcher, PageMeta};
pub use parser::{parse_page, ParsedPage};
pub use worker::Crawler;
