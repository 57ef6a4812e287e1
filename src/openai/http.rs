//! HTTP client implementation for the OpenAI API
//!
//! Handles authentication, request formatting, and mapping of error statuses
//! onto the crate error type. Retrying is left to callers, which see a
//! rate-limited request as `Error::RateLimit`.

use crate::error::{Error, Result};
use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Retry hint used when a 429 carries no `retry-after` header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// HTTP client for making requests to the OpenAI API
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Base URL for API requests
    base_url: String,

    /// Bearer token
    api_key: String,
}

impl HttpClient {
    /// Create a new HTTP client with an API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = ReqwestClient::builder().build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Point the client at a different API root (proxies, compatible servers, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The API root requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        let url = format!("{}/{}", self.base_url, path);
        Url::parse(&url).map_err(|e| Error::Other(format!("Invalid URL: {}", e)))
    }

    /// Send a POST request with a JSON body
    #[instrument(skip(self, body), level = "debug")]
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.build_url(path)?;

        let request = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(body);

        debug!("Sending POST request to {}", path);
        self.execute_request(request).await
    }

    /// Execute an HTTP request and handle the response
    async fn execute_request<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(Error::Http)?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            let response_text = response.text().await.map_err(Error::Http)?;
            error!("API error: {} - {}", status, response_text);

            return Err(Error::RateLimit {
                retry_after_secs: retry_after,
            });
        }

        let response_text = response.text().await.map_err(Error::Http)?;

        if status.is_success() {
            serde_json::from_str(&response_text).map_err(|e| {
                error!("Failed to parse response: {}", e);
                Error::UnexpectedResponse(format!("Failed to parse response: {}", e))
            })
        } else {
            error!("API error: {} - {}", status, response_text);

            if status == StatusCode::UNAUTHORIZED {
                Err(Error::Auth("Invalid API key or credentials".to_string()))
            } else {
                Err(Error::Api {
                    status_code: status.as_u16(),
                    message: response_text,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct TestResponse {
        message: String,
    }

    fn client(server: &ServerGuard) -> HttpClient {
        HttpClient::new("test-key").unwrap().with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_post_request_success() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/test")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::Json(serde_json::json!({"test": "data"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{\"message\": \"success\"}")
            .expect(1)
            .create_async()
            .await;

        let body = serde_json::json!({"test": "data"});
        let response: TestResponse = client(&server).post("test", &body).await.unwrap();
        assert_eq!(response.message, "success");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_uses_retry_after_header() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/test")
            .with_status(429)
            .with_header("retry-after", "7")
            .with_body("{\"error\": {\"message\": \"Rate limit reached\", \"type\": \"requests\"}}")
            .expect(1)
            .create_async()
            .await;

        let result: Result<TestResponse> = client(&server).post("test", &serde_json::json!({})).await;
        assert!(matches!(
            result,
            Err(Error::RateLimit {
                retry_after_secs: 7
            })
        ));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_without_header_defaults_to_a_minute() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/test")
            .with_status(429)
            .create_async()
            .await;

        let result: Result<TestResponse> = client(&server).post("test", &serde_json::json!({})).await;
        assert!(matches!(
            result,
            Err(Error::RateLimit {
                retry_after_secs: 60
            })
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/test")
            .with_status(401)
            .with_body("{\"error\": {\"message\": \"Incorrect API key provided\"}}")
            .create_async()
            .await;

        let result: Result<TestResponse> = client(&server).post("test", &serde_json::json!({})).await;
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/test")
            .with_status(500)
            .with_body("upstream failure")
            .create_async()
            .await;

        let result: Result<TestResponse> = client(&server).post("test", &serde_json::json!({})).await;
        match result {
            Err(Error::Api {
                status_code,
                message,
            }) => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "upstream failure");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_unexpected_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/test")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let result: Result<TestResponse> = client(&server).post("test", &serde_json::json!({})).await;
        assert!(matches!(result, Err(Error::UnexpectedResponse(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HttpClient::new("k").unwrap().with_base_url("http://localhost:1234/v1/");
        assert_eq!(client.base_url(), "http://localhost:1234/v1");
    }
}
