//! Robots.txt handling: fetching, parsing, and per-domain caching

mod cache;
mod parser;

pub use cache::{DomainPolicy, RobotsCache};
pub use parser::ParsedRobots;
