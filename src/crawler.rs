//! # Website Crawler Module
//!
//! This module gathers the raw text that keyword extraction works from. It
//! walks a single site breadth-first, collecting the text of content-bearing
//! elements until either a page cap or a token budget runs out.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: page cap, token budget, user agent and content tags
//! - `SiteCrawler`: the crawl loop itself
//! - `CrawlOutcome`: collected text plus what the crawl did to get it
//! - `is_internal`: the same-site test applied to every discovered link
//!
//! ## Behaviour
//!
//! - Only links on the seed's host and port are followed
//! - Pages are visited in discovery order (FIFO frontier)
//! - Identical text spans are kept once
//! - Hitting the token budget stops the crawl at once, mid-page
//! - A page that fails to load is logged and skipped
//!
//! There is no robots.txt handling or request pacing; each page is fetched
//! once, one after the other.

mod config;
mod content_extraction;
mod error;
mod links;
mod site_crawler;

pub use config::{
    CrawlerConfig, CrawlerConfigBuilder, DEFAULT_CONTENT_TAGS, DEFAULT_MAX_PAGES,
    DEFAULT_TOKEN_BUDGET, DEFAULT_USER_AGENT,
};
pub use content_extraction::{ExtractedPage, extract_page};
pub use error::CrawlError;
pub use links::{is_internal, resolve_link};
pub use site_crawler::SiteCrawler;

use serde::{Deserialize, Serialize};

/// Result of crawling a site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlOutcome {
    /// Collected spans joined with single spaces, in collection order
    pub text: String,

    /// URLs of fully processed pages, in visit order
    pub pages_visited: Vec<String>,

    /// Estimated token count of `text`
    pub estimated_tokens: usize,

    /// Whether the crawl ended because the token budget was reached
    pub budget_exhausted: bool,
}
