//! # Chat Model Module
//!
//! The seam between the pipeline and whichever service produces completions.
//! Keyword extraction and article generation only ever see a `ChatModel`, so
//! they can be driven by the OpenAI client in production and by
//! `MockChatModel` in tests.
//!
//! ## Key Components
//!
//! - `ChatModel`: send one chat request, get the reply text back
//! - `MockChatModel`: scripted replies and recorded requests for testing

use std::future::Future;

use crate::error::Result;
use crate::openai::ChatRequest;

pub mod mock_model;

pub use mock_model::MockChatModel;

/// A chat completion backend
///
/// Implementations return the reply text of the first choice. A provider that
/// is throttling the caller must report it as `Error::RateLimit` so that
/// callers can tell it apart from other failures.
pub trait ChatModel: Send + Sync {
    /// Run one completion
    fn complete(&self, request: ChatRequest) -> impl Future<Output = Result<String>> + Send;
}

impl<M: ChatModel> ChatModel for std::sync::Arc<M> {
    fn complete(&self, request: ChatRequest) -> impl Future<Output = Result<String>> + Send {
        (**self).complete(request)
    }
}
