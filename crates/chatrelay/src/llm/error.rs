//! LLM relay error types.

use thiserror::Error;

use super::provider::Provider;

/// Errors that can occur when calling an upstream provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed (DNS, connect, timeout, body read)
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// A chat request body that cannot be relayed.
#[derive(Debug, Error)]
pub enum InvalidRequest {
    #[error("invalid JSON body: {0}")]
    Json(#[source] serde_json::Error),

    #[error("messages must be an array")]
    MessagesNotArray,

    #[error("malformed message: {0}")]
    MalformedMessage(#[source] serde_json::Error),

    #[error("invalid request field: {0}")]
    Field(#[source] serde_json::Error),
}

/// No usable credential for the provider the selector settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no valid API key available for {0}")]
    NoKeyForProvider(Provider),
}
