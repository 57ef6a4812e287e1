//! Keyword extraction from crawled text
//!
//! The model is asked for "an array" of keywords, but the reply is parsed by
//! splitting on commas and nothing else. Brackets, quotes and padding survive
//! into the keyword strings unless `normalize_keywords` is applied.

use tracing::{debug, instrument};

use crate::error::Result;
use crate::model::ChatModel;
use crate::openai::{ChatRequest, Message};

/// Instruction sent ahead of the crawled text
pub const KEYWORD_SYSTEM_PROMPT: &str = "You are a helpful assistant.  Please analyze this text and provide a list of at least a hundred keywords in an array format.  Do not include any explanatory text; only respond with the array.";

/// Split a model reply into keywords on literal commas.
///
/// No trimming or filtering: `"a, b"` yields `["a", " b"]` and an empty reply
/// yields a single empty keyword.
pub fn parse_keywords(response: &str) -> Vec<String> {
    response.split(',').map(str::to_string).collect()
}

/// Strip whitespace, brackets and quotes from each keyword and drop the ones
/// left empty.
pub fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|keyword| {
            keyword
                .trim_matches(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '"' | '\''))
                .to_string()
        })
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

/// Asks a chat model for the keywords of a body of text
#[derive(Debug, Clone)]
pub struct KeywordExtractor<M> {
    model: M,
    model_name: String,
}

impl<M: ChatModel> KeywordExtractor<M> {
    /// Create an extractor using `model_name` on the given backend
    pub fn new(model: M, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
        }
    }

    /// The request sent for `text`
    pub fn request_for(&self, text: &str) -> ChatRequest {
        ChatRequest::new(self.model_name.clone())
            .message(Message::system(KEYWORD_SYSTEM_PROMPT))
            .message(Message::user(text))
    }

    /// Extract keywords from `text`
    ///
    /// # Errors
    ///
    /// Any failure of the model call is returned as is.
    #[instrument(skip(self, text), fields(model = %self.model_name, text_len = text.len()))]
    pub async fn extract(&self, text: &str) -> Result<Vec<String>> {
        let response = self.model.complete(self.request_for(text)).await?;
        let keywords = parse_keywords(&response);
        debug!(count = keywords.len(), "Parsed keywords");
        Ok(keywords)
    }
}
