//! # Configuration
//!
//! Model names, token limits and API credentials for a pipeline run, read from
//! the environment (and a `.env` file when one exists).
//!
//! | Variable               | Default                      |
//! |------------------------|------------------------------|
//! | `OPENAI_API_KEY`       | required                     |
//! | `OPENAI_BASE_URL`      | `https://api.openai.com/v1`  |
//! | `QUILL_KEYWORD_MODEL`  | `gpt-3.5-turbo-1106`         |
//! | `QUILL_ARTICLE_MODEL`  | `gpt-3.5-turbo`              |
//! | `QUILL_CONTEXT_WINDOW` | `16385`                      |
//! | `QUILL_MAX_TOKENS`     | `4096`                       |
//! | `QUILL_TOKEN_LIMIT`    | `90000`                      |

use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::openai::DEFAULT_BASE_URL;
use crate::ratelimit::{self, RateLimiter};

/// Model used to pull keywords out of crawled text
pub const DEFAULT_KEYWORD_MODEL: &str = "gpt-3.5-turbo-1106";

/// Model used to write articles
pub const DEFAULT_ARTICLE_MODEL: &str = "gpt-3.5-turbo";

/// Context window of the keyword model, in tokens
pub const DEFAULT_CONTEXT_WINDOW: u32 = 16385;

/// Ceiling on tokens per article call
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Tokens per minute allowed by the provider
pub const DEFAULT_TOKEN_LIMIT: u32 = 90000;

/// Tokens held back from the context window when sizing the crawl
const CONTEXT_HEADROOM: u32 = 100;

/// Settings for a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuillConfig {
    pub keyword_model: String,
    pub article_model: String,
    pub context_window: u32,
    pub max_tokens: u32,
    /// Tokens per minute
    pub token_limit: u32,
    pub api_key: String,
    pub api_base_url: String,
}

impl QuillConfig {
    /// Defaults for everything but the API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            keyword_model: DEFAULT_KEYWORD_MODEL.to_string(),
            article_model: DEFAULT_ARTICLE_MODEL.to_string(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_tokens: DEFAULT_MAX_TOKENS,
            token_limit: DEFAULT_TOKEN_LIMIT,
            api_key: api_key.into(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Load from the process environment, after reading `.env` if present
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded environment file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY not set".to_string()))?;

        let mut config = Self::new(api_key);

        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            config.api_base_url = base_url;
        }
        if let Some(model) = lookup("QUILL_KEYWORD_MODEL") {
            config.keyword_model = model;
        }
        if let Some(model) = lookup("QUILL_ARTICLE_MODEL") {
            config.article_model = model;
        }
        if let Some(value) = parsed(&lookup, "QUILL_CONTEXT_WINDOW")? {
            config.context_window = value;
        }
        if let Some(value) = parsed(&lookup, "QUILL_MAX_TOKENS")? {
            config.max_tokens = value;
        }
        if let Some(value) = parsed(&lookup, "QUILL_TOKEN_LIMIT")? {
            config.token_limit = value;
        }

        Ok(config)
    }

    /// Token budget for crawled text: the context window less some headroom
    pub fn crawl_token_budget(&self) -> usize {
        self.context_window.saturating_sub(CONTEXT_HEADROOM) as usize
    }

    /// Spacing between article calls implied by the token limits
    pub fn min_request_interval(&self) -> Result<Duration> {
        ratelimit::min_request_interval(self.token_limit, self.max_tokens).ok_or_else(|| {
            Error::Config("QUILL_TOKEN_LIMIT and QUILL_MAX_TOKENS must be non-zero".to_string())
        })
    }

    /// Limiter for article calls
    pub fn rate_limiter(&self) -> Result<RateLimiter> {
        Ok(RateLimiter::new(self.min_request_interval()?))
    }
}

fn parsed<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("{}={:?}: {}", key, raw, e)))
        })
        .transpose()
}
