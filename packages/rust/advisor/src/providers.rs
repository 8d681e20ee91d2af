//! Wire formats of the supported chat providers.

use serde::{Deserialize, Serialize};

use changedoc_shared::{ChangeDocError, ProviderKind, Result};

pub(crate) const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
pub(crate) const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
pub(crate) const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default endpoint for a provider.
pub(crate) fn default_endpoint(provider: ProviderKind) -> &'static str {
    match provider {
        ProviderKind::OpenAi => OPENAI_URL,
        ProviderKind::Anthropic => ANTHROPIC_URL,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Message<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

// ---------------------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<Message<'a>>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Anthropic
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
    pub messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Pull the generated text out of a successful response body.
pub(crate) fn parse_response(provider: ProviderKind, body: &str) -> Result<String> {
    let text = match provider {
        ProviderKind::OpenAi => {
            let resp: OpenAiResponse = serde_json::from_str(body)
                .map_err(|e| parse_error(provider, &e.to_string(), body))?;
            resp.choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
        }
        ProviderKind::Anthropic => {
            let resp: AnthropicResponse = serde_json::from_str(body)
                .map_err(|e| parse_error(provider, &e.to_string(), body))?;
            resp.content.into_iter().find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
        }
    };

    text.ok_or_else(|| parse_error(provider, "no text content", body))
}

fn parse_error(provider: ProviderKind, reason: &str, body: &str) -> ChangeDocError {
    let excerpt: String = body.chars().take(200).collect();
    ChangeDocError::parse(format!(
        "invalid {} response: {reason} (got: {excerpt})",
        provider.as_str()
    ))
}
