//! Client implementation for the OpenAI chat completions API

use tracing::{debug, instrument};

use crate::config::QuillConfig;
use crate::error::{Error, Result};
use crate::model::ChatModel;
use crate::openai::http::HttpClient;
use crate::openai::types::{ChatCompletion, ChatCompletionResponse, ChatRequest};

/// Client for the OpenAI API
#[derive(Clone)]
pub struct Client {
    http_client: HttpClient,
}

impl Client {
    /// Create a new client with an API key
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(api_key)?,
        })
    }

    /// Create a client for the key and API root in `config`
    pub fn from_config(config: &QuillConfig) -> Result<Self> {
        Ok(Self::with_api_key(config.api_key.clone())?.with_base_url(config.api_base_url.clone()))
    }

    /// Send requests to a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http_client = self.http_client.with_base_url(base_url);
        self
    }

    /// The API root requests are sent to
    pub fn base_url(&self) -> &str {
        self.http_client.base_url()
    }

    /// Run a chat completion and return the first choice
    #[instrument(skip(self, request), fields(model = %request.model), level = "debug")]
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatCompletion> {
        let start = std::time::Instant::now();

        let response: ChatCompletionResponse =
            self.http_client.post("chat/completions", &request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::UnexpectedResponse("No content in completion".to_string()))?;

        debug!(
            duration_ms = start.elapsed().as_millis(),
            "Chat completion finished"
        );

        Ok(ChatCompletion {
            content,
            usage: response.usage,
        })
    }
}

impl ChatModel for Client {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        self.chat_completion(request)
            .await
            .map(|completion| completion.content)
    }
}
