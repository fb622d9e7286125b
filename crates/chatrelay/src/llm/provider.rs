//! Upstream providers and the trait the relay calls them through.

use std::fmt;

use async_trait::async_trait;

use super::error::UpstreamError;
use super::types::{CompletionBody, UpstreamResponse};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Model sent to OpenAI when the requested name is not an OpenAI model.
pub const OPENAI_FALLBACK_MODEL: &str = "gpt-3.5-turbo";

/// Trait for the upstream chat-completion transport.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// POST a chat completion and return the raw status and body.
    async fn chat_completion(
        &self,
        provider: Provider,
        api_key: &str,
        body: &CompletionBody<'_>,
    ) -> Result<UpstreamResponse, UpstreamError>;

    /// GET the OpenAI model list with the given key.
    async fn list_models(&self, api_key: &str) -> Result<UpstreamResponse, UpstreamError>;
}

/// An upstream chat-completion vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAI,
    Groq,
}

impl Provider {
    /// The model actually sent upstream for a requested model name.
    ///
    /// OpenAI only receives OpenAI model names; anything else becomes
    /// [`OPENAI_FALLBACK_MODEL`]. Groq receives the name untouched.
    pub fn effective_model<'a>(&self, requested: &'a str) -> &'a str {
        match self {
            Provider::OpenAI if !is_openai_model(requested) => OPENAI_FALLBACK_MODEL,
            _ => requested,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "OpenAI"),
            Provider::Groq => write!(f, "Groq"),
        }
    }
}

/// True if the model name looks like an OpenAI model.
pub fn is_openai_model(model: &str) -> bool {
    model.contains("gpt-") || model.contains("o1-")
}

/// The caller's declared provider preference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProviderPreference {
    #[default]
    Auto,
    OpenAI,
    Groq,
    /// Any other value. Skips the preference rules entirely.
    Unrecognized(String),
}

impl ProviderPreference {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "auto" => ProviderPreference::Auto,
            "openai" => ProviderPreference::OpenAI,
            "groq" => ProviderPreference::Groq,
            other => ProviderPreference::Unrecognized(other.to_string()),
        }
    }
}
