//! # Pipeline
//!
//! Ties the stages together for one seed URL: crawl the site, extract keywords
//! from the collected text, then write one article per keyword.
//!
//! Every stage runs sequentially and a run always produces a report. A seed
//! that cannot be crawled yields empty text, a keyword extraction failure
//! yields no keywords, and a failed article is stored as an empty string.
//!
//! The article limiter lives inside the pipeline, so one `Pipeline` should
//! serve one run at a time. Callers sharing it put it behind a mutex.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::articles::ArticleGenerator;
use crate::config::QuillConfig;
use crate::crawler::{
    CrawlOutcome, CrawlerConfig, DEFAULT_MAX_PAGES, DEFAULT_TOKEN_BUDGET, SiteCrawler,
};
use crate::error::Result;
use crate::keywords::{KeywordExtractor, normalize_keywords};
use crate::model::ChatModel;
use crate::ratelimit::{RateLimiter, RetryPolicy};

/// First article when extraction produced no keywords
pub const NO_KEYWORDS: &str = "No keywords extracted";

/// First article when no article is stored for the first keyword
pub const NO_ARTICLE: &str = "No article generated";

/// Per-run knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pages visited at most
    pub max_pages: usize,

    /// Estimated tokens of crawled text at most
    pub token_budget: usize,

    /// Strip array punctuation and blanks from the parsed keywords
    pub trim_keywords: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            token_budget: DEFAULT_TOKEN_BUDGET,
            trim_keywords: false,
        }
    }
}

impl PipelineConfig {
    /// Defaults, with the token budget taken from `config`'s context window
    pub fn from_quill_config(config: &QuillConfig) -> Self {
        Self {
            token_budget: config.crawl_token_budget(),
            ..Self::default()
        }
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn token_budget(mut self, token_budget: usize) -> Self {
        self.token_budget = token_budget;
        self
    }

    pub fn trim_keywords(mut self, trim_keywords: bool) -> Self {
        self.trim_keywords = trim_keywords;
        self
    }
}

/// Everything a run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleReport {
    pub seed_url: String,
    pub pages_visited: Vec<String>,
    pub keywords: Vec<String>,
    pub first_article: String,
    /// Keyword to article, in keyword order. A repeated keyword keeps its
    /// first position and its last article.
    pub articles: IndexMap<String, String>,
    pub generated_at: DateTime<Utc>,
}

/// Progress reported while a run is under way
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    /// The crawl finished, possibly with nothing collected
    Crawled(&'a CrawlOutcome),

    /// Keywords came back from the model (empty when extraction failed)
    KeywordsExtracted(&'a [String]),

    /// One keyword was processed; `article` is empty when generation failed
    ArticleWritten { keyword: &'a str, article: &'a str },
}

/// Pick the article to headline a run
///
/// The first keyword's article as stored, even when it is empty.
pub fn first_article(keywords: &[String], articles: &IndexMap<String, String>) -> String {
    let Some(first) = keywords.first() else {
        return NO_KEYWORDS.to_string();
    };

    articles
        .get(first)
        .cloned()
        .unwrap_or_else(|| NO_ARTICLE.to_string())
}

/// Crawl, extract, generate
#[derive(Debug)]
pub struct Pipeline<M> {
    crawler: SiteCrawler,
    extractor: KeywordExtractor<M>,
    generator: ArticleGenerator<M>,
    config: PipelineConfig,
}

impl<M: ChatModel + Clone> Pipeline<M> {
    /// Build a pipeline on `model` using the models and limits in `quill`
    pub fn new(model: M, quill: &QuillConfig, config: PipelineConfig) -> Result<Self> {
        let limiter = quill.rate_limiter()?;
        Self::with_limiter(model, quill, config, limiter)
    }

    /// Like `new`, with an explicit article limiter
    pub fn with_limiter(
        model: M,
        quill: &QuillConfig,
        config: PipelineConfig,
        limiter: RateLimiter,
    ) -> Result<Self> {
        let crawler = SiteCrawler::new(
            CrawlerConfig::builder()
                .max_pages(config.max_pages)
                .token_budget(config.token_budget)
                .build(),
        )?;

        Ok(Self {
            crawler,
            extractor: KeywordExtractor::new(model.clone(), quill.keyword_model.clone()),
            generator: ArticleGenerator::new(model, quill.article_model.clone(), limiter),
            config,
        })
    }

    /// Replace the retry policy used for article calls
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.generator = self.generator.with_retry_policy(retry_policy);
        self
    }

    /// Crawl the site at `base_url`
    pub async fn crawl(&self, base_url: &str) -> Result<CrawlOutcome> {
        Ok(self.crawler.crawl(base_url).await?)
    }

    /// Extract keywords from `text`. A failed call yields no keywords.
    pub async fn extract_keywords(&self, text: &str) -> Vec<String> {
        match self.extractor.extract(text).await {
            Ok(keywords) if self.config.trim_keywords => normalize_keywords(keywords),
            Ok(keywords) => keywords,
            Err(e) => {
                error!(error = %e, "Keyword extraction failed");
                Vec::new()
            }
        }
    }

    /// Write an article for each keyword in order
    ///
    /// `on_article` is called after each keyword with the keyword and its
    /// article. A failed article is logged and stored as an empty string.
    pub async fn generate_articles<F>(
        &self,
        keywords: &[String],
        mut on_article: F,
    ) -> IndexMap<String, String>
    where
        F: FnMut(&str, &str),
    {
        let mut articles = IndexMap::with_capacity(keywords.len());

        for keyword in keywords {
            let article = match self.generator.generate(keyword).await {
                Ok(article) => article,
                Err(e) => {
                    error!(keyword = %keyword, error = %e, "Error generating article");
                    String::new()
                }
            };

            on_article(keyword, &article);
            articles.insert(keyword.clone(), article);
        }

        articles
    }

    /// Run every stage for `base_url`
    pub async fn run(&self, base_url: &str) -> ArticleReport {
        self.run_with_progress(base_url, |_| {}).await
    }

    /// Run every stage for `base_url`, reporting each step to `on_event`
    ///
    /// A seed URL that cannot be crawled at all is logged and treated as a
    /// site with no text; the remaining stages still run on the empty text.
    #[instrument(skip(self, on_event))]
    pub async fn run_with_progress<F>(&self, base_url: &str, mut on_event: F) -> ArticleReport
    where
        F: FnMut(RunEvent<'_>),
    {
        let outcome = match self.crawl(base_url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url = %base_url, error = %e, "Error crawling site");
                CrawlOutcome::default()
            }
        };
        info!(
            pages = outcome.pages_visited.len(),
            tokens = outcome.estimated_tokens,
            "Crawl finished"
        );
        on_event(RunEvent::Crawled(&outcome));

        let keywords = self.extract_keywords(&outcome.text).await;
        info!(count = keywords.len(), "Keywords extracted");
        on_event(RunEvent::KeywordsExtracted(&keywords));

        let articles = self
            .generate_articles(&keywords, |keyword, article| {
                on_event(RunEvent::ArticleWritten { keyword, article })
            })
            .await;

        ArticleReport {
            seed_url: base_url.to_string(),
            pages_visited: outcome.pages_visited,
            first_article: first_article(&keywords, &articles),
            keywords,
            articles,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::MockChatModel;
    use mockito::{Server, ServerGuard};

    async fn site(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body><p>Robots learn.</p></body></html>")
            .create_async()
            .await
    }

    fn pipeline(model: &MockChatModel, config: PipelineConfig) -> Pipeline<MockChatModel> {
        Pipeline::with_limiter(
            model.clone(),
            &QuillConfig::new("sk-test"),
            config,
            RateLimiter::unlimited(),
        )
        .unwrap()
    }

    fn keys(articles: &IndexMap<String, String>) -> Vec<&str> {
        articles.keys().map(String::as_str).collect()
    }

    #[tokio::test]
    async fn test_run_end_to_end() {
        let mut server = Server::new_async().await;
        let _site = site(&mut server).await;
        let model = MockChatModel::new();
        model.push_text("ai, ml,robotics").await;
        model.push_text("  AI article ").await;
        model.push_text("ML article").await;
        model.push_text("Robotics article").await;

        let report = pipeline(&model, PipelineConfig::default())
            .run(&server.url())
            .await;

        assert_eq!(report.keywords, vec!["ai", " ml", "robotics"]);
        assert_eq!(keys(&report.articles), vec!["ai", " ml", "robotics"]);
        assert_eq!(report.first_article, "AI article");
        assert_eq!(report.articles[" ml"], "ML article");
        assert_eq!(report.pages_visited.len(), 1);

        let requests = model.requests().await;
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0].model, "gpt-3.5-turbo-1106");
        assert_eq!(requests[0].messages[1].content, "Robots learn.");
        assert_eq!(requests[1].model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn test_trimmed_keywords() {
        let mut server = Server::new_async().await;
        let _site = site(&mut server).await;
        let model = MockChatModel::new();
        model.push_text(r#"["ai", "ml"]"#).await;
        model.set_default_text("article").await;

        let report = pipeline(&model, PipelineConfig::default().trim_keywords(true))
            .run(&server.url())
            .await;

        assert_eq!(report.keywords, vec!["ai", "ml"]);
    }

    #[tokio::test]
    async fn test_keyword_failure_yields_sentinel() {
        let mut server = Server::new_async().await;
        let _site = site(&mut server).await;
        let model = MockChatModel::new();
        model.push_error(Error::Auth("bad key".to_string())).await;

        let report = pipeline(&model, PipelineConfig::default())
            .run(&server.url())
            .await;

        assert!(report.keywords.is_empty());
        assert!(report.articles.is_empty());
        assert_eq!(report.first_article, NO_KEYWORDS);
        assert_eq!(model.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_article_is_empty_and_run_continues() {
        let model = MockChatModel::new();
        model
            .push_error(Error::Api {
                status_code: 500,
                message: "boom".to_string(),
            })
            .await;
        model.push_text("second").await;
        let keywords = vec!["one".to_string(), "two".to_string()];

        let mut seen = Vec::new();
        let articles = pipeline(&model, PipelineConfig::default())
            .generate_articles(&keywords, |keyword, article| {
                seen.push((keyword.to_string(), article.to_string()))
            })
            .await;

        assert_eq!(articles["one"], "");
        assert_eq!(articles["two"], "second");
        assert_eq!(
            seen,
            vec![
                ("one".to_string(), String::new()),
                ("two".to_string(), "second".to_string())
            ]
        );
        assert_eq!(first_article(&keywords, &articles), "");
    }

    #[test]
    fn test_first_article_placeholders() {
        let mut articles = IndexMap::new();
        assert_eq!(first_article(&[], &articles), NO_KEYWORDS);

        let keywords = vec!["ai".to_string()];
        assert_eq!(first_article(&keywords, &articles), NO_ARTICLE);

        articles.insert("ai".to_string(), String::new());
        assert_eq!(first_article(&keywords, &articles), "");
    }

    #[tokio::test]
    async fn test_single_failed_article_headlines_as_empty() {
        let mut server = Server::new_async().await;
        let _site = site(&mut server).await;
        let model = MockChatModel::new();
        model.push_text("ai").await;
        model
            .push_error(Error::Api {
                status_code: 500,
                message: "boom".to_string(),
            })
            .await;

        let report = pipeline(&model, PipelineConfig::default())
            .run(&server.url())
            .await;

        assert_eq!(report.articles["ai"], "");
        assert_eq!(report.first_article, "");
    }

    #[tokio::test]
    async fn test_repeated_keyword_keeps_last_article() {
        let model = MockChatModel::new();
        model.push_text("first").await;
        model.push_text("other").await;
        model.push_text("last").await;
        let keywords: Vec<String> = ["ai", "ml", "ai"].iter().map(|k| k.to_string()).collect();

        let articles = pipeline(&model, PipelineConfig::default())
            .generate_articles(&keywords, |_, _| {})
            .await;

        assert_eq!(keys(&articles), vec!["ai", "ml"]);
        assert_eq!(articles["ai"], "last");
        assert_eq!(first_article(&keywords, &articles), "last");
    }

    #[tokio::test]
    async fn test_unparseable_seed_runs_on_empty_text() {
        let model = MockChatModel::new();

        let report = pipeline(&model, PipelineConfig::default())
            .run("example.com")
            .await;

        assert!(report.pages_visited.is_empty());
        assert_eq!(report.seed_url, "example.com");
        // An empty reply splits into one empty keyword
        assert_eq!(report.keywords, vec![""]);
        assert_eq!(report.first_article, "");

        let requests = model.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages[1].content, "");
    }

    #[tokio::test]
    async fn test_progress_events_follow_the_stages() {
        let mut server = Server::new_async().await;
        let _site = site(&mut server).await;
        let model = MockChatModel::new();
        model.push_text("ai,ml").await;
        model.set_default_text("article").await;

        let mut events = Vec::new();
        let report = pipeline(&model, PipelineConfig::default())
            .run_with_progress(&server.url(), |event| {
                events.push(match event {
                    RunEvent::Crawled(outcome) => format!("crawled {}", outcome.pages_visited.len()),
                    RunEvent::KeywordsExtracted(keywords) => format!("keywords {}", keywords.len()),
                    RunEvent::ArticleWritten { keyword, article } => {
                        format!("{}: {}", keyword, article)
                    }
                })
            })
            .await;

        assert_eq!(
            events,
            vec!["crawled 1", "keywords 2", "ai: article", "ml: article"]
        );
        assert_eq!(report.first_article, "article");
    }

    #[test]
    fn test_config_from_quill_config() {
        let mut quill = QuillConfig::new("sk-test");
        quill.context_window = 4096;
        let config = PipelineConfig::from_quill_config(&quill).max_pages(3);
        assert_eq!(config.token_budget, 3996);
        assert_eq!(config.max_pages, 3);
        assert!(!config.trim_keywords);
    }
}
