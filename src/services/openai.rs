//! OpenAI Chat Client
//!
//! Minimal blocking client for the chat completions endpoint, used as the
//! agent's [`LanguageModel`].

use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::execution::{UnitError, UnitResult};

use super::LanguageModel;

/// Chat completions endpoint.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model, chosen for cost.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const TEMPERATURE: f32 = 0.7;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// [`LanguageModel`] backed by the OpenAI API.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> UnitResult<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            api_key: api_key.into(),
            model: model.into(),
            url: OPENAI_API_URL.to_string(),
        })
    }

    /// Targets another OpenAI-compatible endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, prompt: &'a str, max_tokens: u32) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: TEMPERATURE,
        }
    }
}

impl LanguageModel for OpenAiClient {
    fn complete(&self, prompt: &str, max_tokens: u32) -> UnitResult<String> {
        debug!("Calling {} ({} max tokens)", self.model, max_tokens);

        let response: ChatResponse = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt, max_tokens))
            .send()?
            .error_for_status()?
            .json()?;

        first_content(response)
    }
}

/// Trimmed content of the first choice.
fn first_content(response: ChatResponse) -> UnitResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| UnitError::failed("language model returned no content"))
}
