//! Model abstraction for language-model completion.
//!
//! The [`ChatModel`] trait decouples the turn loop from the transport
//! (currently the Anthropic Messages API). Tests use scripted models that
//! return predetermined replies without network access.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::transcript::Turn;

/// Environment variable holding the Anthropic API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Abstraction over language-model completion backends.
pub trait ChatModel {
    /// Produce the next assistant reply for the given transcript.
    ///
    /// Fails on transport or API errors; the caller decides how to recover.
    fn complete(&self, system_prompt: &str, history: &[Turn]) -> Result<String>;
}

/// Request body for the Anthropic Messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Turn],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Build a client reading the API key from `ANTHROPIC_API_KEY`.
    pub fn new(
        api_base: &str,
        model: &str,
        max_tokens: u32,
        request_timeout: Duration,
    ) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| anyhow!("{API_KEY_ENV} environment variable is not set"))?;
        let http = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            max_tokens,
        })
    }
}

impl ChatModel for AnthropicClient {
    #[instrument(skip_all, fields(model = %self.model, turns = history.len()))]
    fn complete(&self, system_prompt: &str, history: &[Turn]) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_prompt,
            messages: history,
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .context("send messages request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|err| err.error.message)
                .unwrap_or(body);
            return Err(anyhow!("messages request failed ({status}): {detail}"));
        }

        let parsed: MessagesResponse = response.json().context("parse messages response")?;
        let reply = parsed
            .content
            .iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text.clone()),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| anyhow!("response contained no text content"))?;

        debug!(reply_bytes = reply.len(), "model reply received");
        Ok(reply)
    }
}
