//! Bounded breadth-first crawl of a single site

use indexmap::IndexSet;
use reqwest::Client as ReqwestClient;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::content_extraction::{ExtractedPage, extract_page};
use crate::crawler::error::CrawlError;
use crate::crawler::links::is_internal;
use crate::crawler::{CrawlOutcome, CrawlerConfig};
use crate::tokens::estimate_tokens;

/// Per-crawl bookkeeping.
///
/// All three sets keep insertion order. The frontier is drained from the
/// front, which makes the traversal breadth-first and repeatable.
#[derive(Debug, Default)]
struct CrawlState {
    visited: IndexSet<String>,
    frontier: IndexSet<String>,
    collected: IndexSet<String>,
    estimated_tokens: usize,
}

impl CrawlState {
    fn new(seed: String) -> Self {
        let mut state = Self::default();
        state.frontier.insert(seed);
        state
    }

    fn next_url(&mut self) -> Option<String> {
        self.frontier.shift_remove_index(0)
    }

    /// Add a span if it fits in the budget. Returns `false` when it does not.
    ///
    /// Empty spans and spans already collected are skipped and cost nothing.
    fn collect(&mut self, span: String, token_budget: usize) -> bool {
        if span.is_empty() || self.collected.contains(&span) {
            return true;
        }

        let estimate = estimate_tokens(&span);
        if self.estimated_tokens + estimate > token_budget {
            return false;
        }

        self.collected.insert(span);
        self.estimated_tokens += estimate;
        true
    }

    fn finish(self, budget_exhausted: bool) -> CrawlOutcome {
        let text = self
            .collected
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");

        CrawlOutcome {
            text,
            pages_visited: self.visited.into_iter().collect(),
            estimated_tokens: self.estimated_tokens,
            budget_exhausted,
        }
    }
}

/// Crawls one site at a time, sequentially
#[derive(Debug, Clone)]
pub struct SiteCrawler {
    client: ReqwestClient,
    config: CrawlerConfig,
}

impl SiteCrawler {
    /// Create a crawler with its own HTTP client
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let mut builder = ReqwestClient::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Crawl a site starting at `base_url`
    ///
    /// Pages are visited until the frontier is empty or `max_pages` pages have
    /// been visited. A page that fails to fetch is logged and skipped without
    /// counting as visited.
    ///
    /// The first span that would push the collected text over the token budget
    /// ends the whole crawl: no further spans, links or pages are processed.
    ///
    /// # Errors
    ///
    /// Only an unparseable `base_url` is an error.
    #[instrument(skip(self), fields(max_pages = self.config.max_pages, token_budget = self.config.token_budget))]
    pub async fn crawl(&self, base_url: &str) -> Result<CrawlOutcome, CrawlError> {
        let base = Url::parse(base_url)?;
        let mut state = CrawlState::new(base.to_string());

        info!("Starting crawl for {}", base);

        while state.visited.len() < self.config.max_pages {
            let Some(current) = state.next_url() else {
                break;
            };
            if state.visited.contains(&current) {
                continue;
            }

            let page = match self.fetch_page(&current).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %current, error = %e, "Error scraping page");
                    continue;
                }
            };

            for span in page.spans {
                if !state.collect(span, self.config.token_budget) {
                    info!(
                        url = %current,
                        estimated_tokens = state.estimated_tokens,
                        pages_visited = state.visited.len(),
                        "Token budget reached, stopping crawl"
                    );
                    return Ok(state.finish(true));
                }
            }

            for link in page.links {
                if is_internal(&link, &base) {
                    let link = link.to_string();
                    if !state.visited.contains(&link) {
                        state.frontier.insert(link);
                    }
                }
            }

            debug!(
                url = %current,
                estimated_tokens = state.estimated_tokens,
                frontier = state.frontier.len(),
                "Visited page"
            );
            state.visited.insert(current);
        }

        info!(
            pages_visited = state.visited.len(),
            estimated_tokens = state.estimated_tokens,
            "Crawl finished"
        );
        Ok(state.finish(false))
    }

    async fn fetch_page(&self, url: &str) -> Result<ExtractedPage, CrawlError> {
        let page_url = Url::parse(url)?;
        let response = self.client.get(page_url.clone()).send().await?;

        // Error pages still carry text and links, so the body is used regardless.
        debug!(url = %page_url, status = %response.status(), "Fetched page");
        let body = response.text().await?;

        extract_page(&body, &page_url, &self.config.content_tags)
    }
}
