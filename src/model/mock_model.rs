//! # Mock Chat Model for Testing
//!
//! Provides a `MockChatModel` that implements the `ChatModel` trait for use in
//! tests. Replies are scripted in order; once the script runs out a default
//! reply is returned. Every request and the instant it arrived are recorded so
//! tests can check prompts and pacing.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::model::ChatModel;
use crate::openai::ChatRequest;

/// A mock chat model for testing purposes.
#[derive(Debug, Clone, Default)]
pub struct MockChatModel {
    /// Replies handed out in order
    script: Arc<Mutex<VecDeque<Result<String>>>>,

    /// Reply once the script is exhausted
    default_reply: Arc<Mutex<String>>,

    /// Every request received, with its arrival time
    calls: Arc<Mutex<Vec<(Instant, ChatRequest)>>>,
}

impl MockChatModel {
    /// Creates a new mock model that replies with an empty string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub async fn push_text(&self, text: &str) {
        self.script.lock().await.push_back(Ok(text.to_string()));
    }

    /// Queue a failure.
    pub async fn push_error(&self, error: Error) {
        self.script.lock().await.push_back(Err(error));
    }

    /// Queue a provider rate-limit signal.
    pub async fn push_rate_limit(&self) {
        self.push_error(Error::RateLimit {
            retry_after_secs: 60,
        })
        .await;
    }

    /// Set the reply used once the script is exhausted.
    pub async fn set_default_text(&self, text: &str) {
        *self.default_reply.lock().await = text.to_string();
    }

    /// Requests received so far, in order.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    /// Arrival time of each request, in order.
    pub async fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().await.iter().map(|(at, _)| *at).collect()
    }

    /// Number of requests received so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl ChatModel for MockChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        self.calls.lock().await.push((Instant::now(), request));

        let next = self.script.lock().await.pop_front();
        match next {
            Some(reply) => reply,
            None => Ok(self.default_reply.lock().await.clone()),
        }
    }
}
