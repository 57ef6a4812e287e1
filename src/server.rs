//! Web form front end
//!
//! `GET /` serves a one-field form. `POST /` takes the submitted `url`, runs the
//! pipeline and answers with the first article and the full keyword map as
//! JSON. Runs are queued behind a mutex, one at a time.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::Extension,
    http::StatusCode,
    response::Html,
    routing::get,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::ChatModel;
use crate::pipeline::Pipeline;

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:5000";

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>quill</title></head>
<body>
  <h1>Generate articles from a website</h1>
  <form method="post" action="/">
    <input type="url" name="url" placeholder="https://example.com" required>
    <button type="submit">Generate</button>
  </form>
</body>
</html>
"#;

/// Pipeline shared by all requests
pub type SharedPipeline<M> = Arc<Mutex<Pipeline<M>>>;

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub first_article: String,
    pub articles: IndexMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// The input form
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Run the pipeline for the submitted URL
pub async fn generate_handler<M>(
    Extension(pipeline): Extension<SharedPipeline<M>>,
    Form(form): Form<GenerateForm>,
) -> std::result::Result<Json<GenerateResponse>, ApiError>
where
    M: ChatModel + Clone + 'static,
{
    let url = form.url.trim();
    if url.is_empty() {
        warn!("Rejected submission without a url");
        return Err(bad_request("url is required"));
    }

    let pipeline = pipeline.lock().await;
    let report = pipeline.run(url).await;

    Ok(Json(GenerateResponse {
        first_article: report.first_article,
        articles: report.articles,
    }))
}

/// Routes for the form front end
pub fn router<M>(pipeline: Pipeline<M>) -> Router
where
    M: ChatModel + Clone + 'static,
{
    let shared: SharedPipeline<M> = Arc::new(Mutex::new(pipeline));

    Router::new()
        .route("/", get(index_handler).post(generate_handler::<M>))
        .layer(Extension(shared))
}

/// Serve the form front end on `addr` until the process is stopped
pub async fn serve<M>(pipeline: Pipeline<M>, addr: SocketAddr) -> Result<()>
where
    M: ChatModel + Clone + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| crate::error::Error::Other(format!("cannot bind {}: {}", addr, e)))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(pipeline))
        .await
        .map_err(|e| crate::error::Error::Other(format!("server error: {}", e)))
}
