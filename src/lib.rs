//! # quill - website to articles
//!
//! Crawls a website, asks a language model for the keywords of what it found,
//! and drafts one article per keyword while staying inside the provider's
//! tokens-per-minute allowance.
//!
//! ## Features
//!
//! - Bounded, breadth-first crawling of a single host with a token budget
//! - Keyword extraction and article generation over the OpenAI chat API
//! - Client-side request pacing with retry on provider rate limits
//! - A `ChatModel` seam so any backend (or a scripted mock) can be plugged in
//! - An HTML form front end served with axum
//!
//! ## Example
//!
//! ```rust,no_run
//! use quill::config::QuillConfig;
//! use quill::openai::Client;
//! use quill::pipeline::{Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = QuillConfig::from_env()?;
//!     let client = Client::from_config(&config)?;
//!
//!     let pipeline = Pipeline::new(client, &config, PipelineConfig::from_quill_config(&config))?;
//!     let report = pipeline.run("https://example.com").await;
//!
//!     println!("{}", report.first_article);
//!     Ok(())
//! }
//! ```

mod error;

pub mod articles;
pub mod config;
pub mod crawler;
pub mod keywords;
pub mod model;
pub mod openai;
pub mod pipeline;
pub mod ratelimit;
pub mod server;
pub mod tokens;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::config::QuillConfig;
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::model::ChatModel;
    pub use crate::pipeline::{ArticleReport, Pipeline, PipelineConfig};
}
