//! OpenAI-compatible HTTP upstream.
//!
//! Both OpenAI and Groq speak the same `/chat/completions` dialect, so one
//! client covers both; only the base URL and key differ.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::error::UpstreamError;
use super::provider::{GROQ_BASE_URL, OPENAI_BASE_URL, Provider, Upstream};
use super::types::{CompletionBody, UpstreamResponse};

/// Base URLs for each provider.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub openai_base_url: String,
    pub groq_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openai_base_url: OPENAI_BASE_URL.to_string(),
            groq_base_url: GROQ_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    fn base_url(&self, provider: Provider) -> &str {
        let base = match provider {
            Provider::OpenAI => &self.openai_base_url,
            Provider::Groq => &self.groq_base_url,
        };
        base.trim_end_matches('/')
    }

    pub fn completions_url(&self, provider: Provider) -> String {
        format!("{}/chat/completions", self.base_url(provider))
    }

    pub fn models_url(&self) -> String {
        format!("{}/models", self.base_url(Provider::OpenAI))
    }
}

/// reqwest-backed [`Upstream`]. Responses are returned as-is; status codes are
/// never turned into errors here.
pub struct HttpUpstream {
    client: Client,
    endpoints: Endpoints,
}

impl HttpUpstream {
    pub fn new(client: Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// Build a client with an overall request timeout.
    pub fn with_timeout(endpoints: Endpoints, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, endpoints))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn chat_completion(
        &self,
        provider: Provider,
        api_key: &str,
        body: &CompletionBody<'_>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.endpoints.completions_url(provider);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        Ok(UpstreamResponse::new(status, text))
    }

    async fn list_models(&self, api_key: &str) -> Result<UpstreamResponse, UpstreamError> {
        let response = self
            .client
            .get(self.endpoints.models_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        Ok(UpstreamResponse::new(status, text))
    }
}
