//! Article generation, one keyword at a time

use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::model::ChatModel;
use crate::openai::{ChatRequest, Message};
use crate::ratelimit::{RateLimiter, RetryPolicy};

/// Role given to the model for every article
pub const ARTICLE_SYSTEM_PROMPT: &str =
    "You are an AI trained to generate informative and original articles.";

/// User turn asking for an article about `keyword`
pub fn article_prompt(keyword: &str) -> String {
    format!(
        "Write a detailed, informative, and original article about {}.",
        keyword
    )
}

/// Writes articles through a rate-limited chat model
///
/// Calls go out one at a time. Before each call the limiter waits out whatever
/// is left of its interval since the last successful call. A rate-limit error
/// from the provider is retried with the identical request according to the
/// retry policy; any other error is returned immediately.
#[derive(Debug)]
pub struct ArticleGenerator<M> {
    model: M,
    model_name: String,
    limiter: RateLimiter,
    retry_policy: RetryPolicy,
}

impl<M: ChatModel> ArticleGenerator<M> {
    /// Create a generator with the default (unbounded) retry policy
    pub fn new(model: M, model_name: impl Into<String>, limiter: RateLimiter) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            limiter,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// The limiter pacing this generator's calls
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The request sent for `keyword`
    pub fn request_for(&self, keyword: &str) -> ChatRequest {
        ChatRequest::new(self.model_name.clone())
            .message(Message::system(ARTICLE_SYSTEM_PROMPT))
            .message(Message::user(article_prompt(keyword)))
    }

    /// Generate an article about `keyword`, trimmed of surrounding whitespace
    ///
    /// # Errors
    ///
    /// Returns the provider error for any failure other than a rate limit, and
    /// the last rate-limit error once a bounded retry policy is exhausted.
    #[instrument(skip(self), fields(model = %self.model_name))]
    pub async fn generate(&self, keyword: &str) -> Result<String> {
        let request = self.request_for(keyword);
        let mut retries = 0;

        loop {
            self.limiter.until_ready().await;

            match self.model.complete(request.clone()).await {
                Ok(article) => {
                    self.limiter.record_request().await;
                    debug!(len = article.len(), "Generated article");
                    return Ok(article.trim().to_string());
                }
                Err(e) if e.is_rate_limit() => {
                    if !self.retry_policy.allows_retry(retries) {
                        warn!(retries, "Rate limit exceeded and retries exhausted");
                        return Err(e);
                    }

                    retries += 1;
                    let delay = self.retry_policy.delay(retries);
                    warn!(
                        attempt = retries,
                        delay_secs = delay.as_secs(),
                        "Rate limit exceeded. Waiting to retry..."
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
