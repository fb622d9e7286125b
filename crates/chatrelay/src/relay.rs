//! The relay core shared by the server and function adapters.
//!
//! Every operation returns either a [`Reply`] or a [`RelayError`]; both carry a
//! status code and a JSON body, so adapters only decide how to put them on the
//! wire.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, error};

use crate::llm::{
    self, ChatRequest, CompletionBody, GROQ_KEYS_URL, InvalidRequest, KeyStatus, OPENAI_KEYS_URL,
    Provider, ProviderCredentials, SelectionError, Upstream, UpstreamError,
};

const KEY_VALID_MESSAGE: &str = "API key is valid!";
/// Length of the upstream body echoed back when a key test fails, counted in
/// Unicode scalar values (`char`s), not UTF-16 code units. Text outside the
/// Basic Multilingual Plane therefore keeps more visible characters than a
/// UTF-16 cut would.
const KEY_ERROR_PREVIEW_CHARS: usize = 500;

// ============================================================================
// Reply
// ============================================================================

/// A status code plus JSON body, ready to be rendered by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

// ============================================================================
// Key test report
// ============================================================================

/// Result of probing the OpenAI key against the model list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyTestReport {
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusCode,
    pub key_type: &'static str,
    pub key_valid: bool,
    pub response: String,
}

fn serialize_status<S: Serializer>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(status.as_u16())
}

// ============================================================================
// RelayError
// ============================================================================

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no API key configured")]
    NoKeysConfigured(KeyStatus),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),

    #[error("proxy error: {0}")]
    Proxy(#[source] UpstreamError),

    #[error("no OpenAI API key configured")]
    OpenAIKeyMissing,

    #[error("key test failed: {0}")]
    KeyTest(#[source] UpstreamError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest(_) | RelayError::OpenAIKeyMissing => {
                StatusCode::BAD_REQUEST
            }
            RelayError::NoKeysConfigured(_)
            | RelayError::Selection(_)
            | RelayError::Proxy(_)
            | RelayError::KeyTest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The JSON error payload returned to the client.
    pub fn body(&self) -> Value {
        match self {
            RelayError::NoKeysConfigured(keys) => json!({
                "error": "No API key configured. Please set either GROQ_API_KEY or OPENAI_API_KEY.",
                "instructions": format!(
                    "Get your API key from {GROQ_KEYS_URL} (for Groq) \
                     or {OPENAI_KEYS_URL} (for OpenAI)"
                ),
                "available_keys": {
                    "groq": availability(keys.has_groq),
                    "openai": availability(keys.has_openai),
                }
            }),
            RelayError::Selection(_) => json!({
                "error": "No valid API key available for the requested provider"
            }),
            RelayError::InvalidRequest(InvalidRequest::MessagesNotArray) => json!({
                "error": "Invalid request: messages must be an array"
            }),
            RelayError::InvalidRequest(InvalidRequest::Json(e)) => json!({
                "error": "Invalid JSON body",
                "detail": e.to_string(),
            }),
            RelayError::InvalidRequest(InvalidRequest::MalformedMessage(e)) => json!({
                "error": "Invalid request: malformed message",
                "detail": e.to_string(),
            }),
            RelayError::InvalidRequest(InvalidRequest::Field(e)) => json!({
                "error": "Invalid request",
                "detail": e.to_string(),
            }),
            RelayError::Proxy(e) => json!({
                "error": "Proxy error",
                "detail": e.to_string(),
            }),
            RelayError::OpenAIKeyMissing => json!({
                "error": "No OpenAI API key configured"
            }),
            RelayError::KeyTest(e) => json!({
                "error": "Test failed",
                "detail": e.to_string(),
            }),
        }
    }

    pub fn into_reply(self) -> Reply {
        Reply::new(self.status(), self.body())
    }
}

fn availability(valid: bool) -> &'static str {
    if valid { "Valid" } else { "Not set or invalid" }
}

// ============================================================================
// Relay
// ============================================================================

/// Immutable relay state: credentials, their validity, and the upstream.
pub struct Relay {
    credentials: ProviderCredentials,
    keys: KeyStatus,
    upstream: Arc<dyn Upstream>,
}

impl Relay {
    pub fn new(credentials: ProviderCredentials, upstream: Arc<dyn Upstream>) -> Self {
        let keys = credentials.key_status();
        Self {
            credentials,
            keys,
            upstream,
        }
    }

    pub fn key_status(&self) -> KeyStatus {
        self.keys
    }

    pub fn credentials(&self) -> &ProviderCredentials {
        &self.credentials
    }

    /// Relay one chat request body to the selected provider.
    ///
    /// Key availability is checked before the body is looked at. The upstream
    /// status is preserved in the returned [`Reply`], including failures.
    pub async fn chat(&self, body: &[u8]) -> Result<Reply, RelayError> {
        if !self.keys.any() {
            return Err(RelayError::NoKeysConfigured(self.keys));
        }

        let request = ChatRequest::from_body(body)?;
        let provider = llm::select_provider(&request.provider, &request.model, self.keys)?;
        let api_key = self
            .api_key(provider)
            .ok_or(SelectionError::NoKeyForProvider(provider))?;

        let completion = CompletionBody {
            model: provider.effective_model(&request.model),
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        debug!(
            provider = %provider,
            model = completion.model,
            messages = request.messages.len(),
            "Relaying chat request"
        );

        let response = self
            .upstream
            .chat_completion(provider, api_key, &completion)
            .await
            .map_err(|e| {
                error!(provider = %provider, error = %e, "Upstream request failed");
                RelayError::Proxy(e)
            })?;

        Ok(Reply::new(response.status, llm::normalize(&response)))
    }

    /// Probe the configured OpenAI key against the model list endpoint.
    pub async fn test_key(&self) -> Result<KeyTestReport, RelayError> {
        if !self.keys.has_openai {
            return Err(RelayError::OpenAIKeyMissing);
        }
        let api_key = self
            .api_key(Provider::OpenAI)
            .ok_or(RelayError::OpenAIKeyMissing)?;

        let response = self.upstream.list_models(api_key).await.map_err(|e| {
            error!(error = %e, "Key test request failed");
            RelayError::KeyTest(e)
        })?;

        let key_valid = response.is_success();
        Ok(KeyTestReport {
            status: response.status,
            key_type: llm::key_type(api_key),
            key_valid,
            response: if key_valid {
                KEY_VALID_MESSAGE.to_string()
            } else {
                response.body.chars().take(KEY_ERROR_PREVIEW_CHARS).collect()
            },
        })
    }

    fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::OpenAI => self.credentials.openai_api_key.as_deref(),
            Provider::Groq => self.credentials.groq_api_key.as_deref(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
