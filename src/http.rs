// Shared HTTP client utilities

use crate::config::Config;
use anyhow::Context;
use reqwest::{Client, RequestBuilder, header};

/// User-Agent string for all HTTP requests
const USER_AGENT: &str = concat!("goup/", env!("CARGO_PKG_VERSION"));

/// Build the client every request goes through, with the configured timeout.
pub fn client(config: &Config) -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.http_timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Attach a bearer token when one is configured.
pub fn with_token(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
        None => request,
    }
}

/// Connection resets, timeouts and truncated bodies are worth another attempt.
pub fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_body()
}
