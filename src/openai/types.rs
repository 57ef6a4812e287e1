//! Type definitions for the chat completions API

use serde::{Deserialize, Serialize};

/// Chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model to use (e.g. "gpt-3.5-turbo")
    pub model: String,

    /// Conversation messages
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /// Create an empty request for the given model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
        }
    }

    /// Add a message to the conversation
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// "system" or "user"
    pub role: String,

    /// Text of the turn
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Token usage reported by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Prompt plus completion
    #[serde(default)]
    pub total_tokens: u32,
}

/// Text of the first choice plus usage
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    /// Assistant reply
    pub content: String,

    /// Token usage, when reported
    pub usage: Option<Usage>,
}

/// Raw response body of `POST /chat/completions`
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}
