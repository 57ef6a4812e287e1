//! OpenAI API implementation
//!
//! A small client for the chat completions endpoint: the only OpenAI surface
//! the keyword and article steps need.

mod client;
mod http;
mod types;

pub use client::Client;
pub use http::{DEFAULT_BASE_URL, HttpClient};
pub use types::{ChatCompletion, ChatRequest, Message, Usage};
