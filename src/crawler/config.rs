//! # Crawler Configuration Module
//!
//! Bounds and request settings for a single site crawl. Uses a builder pattern
//! like the other configuration types in the crate.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: page cap, token budget, user agent and content tags
//! - `CrawlerConfigBuilder`: builder for `CrawlerConfig`

use std::time::Duration;

/// Desktop browser user agent sent with every page request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Default page cap for a crawl
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Default token budget: a 16385-token context window minus 100 tokens of headroom
pub const DEFAULT_TOKEN_BUDGET: usize = 16385 - 100;

/// Tags scanned for text, in scan order
pub const DEFAULT_CONTENT_TAGS: [&str; 10] = [
    "p", "article", "section", "div", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Maximum number of pages to visit
    pub max_pages: usize,

    /// Maximum estimated tokens of collected text
    pub token_budget: usize,

    /// User agent to use for requests
    pub user_agent: String,

    /// Tag names whose text is collected, scanned in this order
    pub content_tags: Vec<String>,

    /// Per-request timeout; `None` keeps the transport default
    pub request_timeout: Option<Duration>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            token_budget: DEFAULT_TOKEN_BUDGET,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            content_tags: DEFAULT_CONTENT_TAGS.iter().map(|t| t.to_string()).collect(),
            request_timeout: None,
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the maximum number of pages to visit
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the token budget for collected text
    pub fn token_budget(mut self, token_budget: usize) -> Self {
        self.config.token_budget = token_budget;
        self
    }

    /// Set a per-request timeout
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.config.request_timeout = Some(request_timeout);
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CrawlerConfig::default();
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.token_budget, 16285);
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(config.content_tags.first().map(String::as_str), Some("p"));
        assert_eq!(config.content_tags.last().map(String::as_str), Some("h6"));
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = CrawlerConfig::builder()
            .max_pages(3)
            .token_budget(50)
            .request_timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.max_pages, 3);
        assert_eq!(config.token_budget, 50);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
    }
}
