//! HTTP advisory client.
//!
//! [`AdvisorClient`] implements [`Advisor`] on top of the OpenAI chat
//! completions API or the Anthropic messages API. One prompt is sent as one
//! user message; the first text block of the reply is returned. No retries.

mod providers;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use changedoc_shared::{
    Advisor, AdvisorConfig, ChangeDocError, ProviderKind, Result, resolve_api_key,
};

use providers::{ANTHROPIC_VERSION, AnthropicRequest, Message, OpenAiRequest};

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("changedoc/", env!("CARGO_PKG_VERSION"));

/// Advisory client for a single provider and model.
#[derive(Debug, Clone)]
pub struct AdvisorClient {
    client: Client,
    provider: ProviderKind,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AdvisorClient {
    /// Build a client from config, with an explicit API key.
    pub fn new(config: &AdvisorConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChangeDocError::Network(format!("failed to build HTTP client: {e}")))?;

        let endpoint = config
            .base_url
            .clone()
            .unwrap_or_else(|| providers::default_endpoint(config.provider).to_string());

        Ok(Self {
            client,
            provider: config.provider,
            endpoint,
            api_key: api_key.into(),
            model: config.model().to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &AdvisorConfig) -> Result<Self> {
        let key = resolve_api_key(config)?;
        Self::new(config, key)
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        let messages = vec![Message {
            role: "user",
            content: prompt,
        }];

        match self.provider {
            ProviderKind::OpenAi => self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&OpenAiRequest {
                    model: &self.model,
                    messages,
                    max_tokens: self.max_tokens,
                    temperature: self.temperature,
                }),
            ProviderKind::Anthropic => self
                .client
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&AnthropicRequest {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    temperature: self.temperature,
                    messages,
                }),
        }
    }
}

#[async_trait]
impl Advisor for AdvisorClient {
    #[instrument(skip_all, fields(provider = self.provider.as_str(), model = %self.model, prompt_chars = prompt.len()))]
    async fn advise(&self, prompt: &str) -> Result<String> {
        let response = self
            .request(prompt)
            .send()
            .await
            .map_err(|e| ChangeDocError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ChangeDocError::Network(format!("{}: failed to read body: {e}", self.endpoint))
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body, "provider returned an error");
            return Err(ChangeDocError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let text = providers::parse_response(self.provider, &body)?;
        debug!(response_chars = text.len(), "advisory response received");
        Ok(text)
    }
}
