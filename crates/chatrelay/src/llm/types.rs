//! Common types for relayed chat completions.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::InvalidRequest;
use super::provider::ProviderPreference;

pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 800;

/// A chat request as posted by the browser client.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub provider: ProviderPreference,
}

/// Optional request fields. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct RequestOptions {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    provider: Option<String>,
}

impl ChatRequest {
    /// Parse a raw request body.
    ///
    /// An empty body is treated as `{}`, which then fails the `messages` check.
    pub fn from_body(body: &[u8]) -> Result<Self, InvalidRequest> {
        let value = if body.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(body).map_err(InvalidRequest::Json)?
        };
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, InvalidRequest> {
        let mut fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let Some(Value::Array(items)) = fields.remove("messages") else {
            return Err(InvalidRequest::MessagesNotArray);
        };
        let messages = items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Message>, _>>()
            .map_err(InvalidRequest::MalformedMessage)?;

        let options: RequestOptions =
            serde_json::from_value(Value::Object(fields)).map_err(InvalidRequest::Field)?;

        Ok(Self {
            messages,
            model: options.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            provider: options
                .provider
                .as_deref()
                .map(ProviderPreference::from_wire)
                .unwrap_or_default(),
        })
    }
}

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// The exact body sent to an upstream chat-completion endpoint.
#[derive(Debug, Serialize)]
pub struct CompletionBody<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Raw upstream answer: status and body text, untouched.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body parsed as JSON, if it is JSON.
    pub fn parsed(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}
