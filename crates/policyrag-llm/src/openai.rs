use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use policyrag_core::config::LlmSettings;
use policyrag_core::traits::Generator;
use policyrag_core::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenAI and API-compatible servers.
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, base_url: &str, model: &str, timeout: Duration) -> Result<Self, Error> {
        if api_key.trim().is_empty() {
            return Err(Error::InvalidConfig("OpenAI API key is required".into()));
        }
        let client = Client::builder().timeout(timeout).build().map_err(Error::collaborator)?;
        Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model: model.to_string() })
    }

    /// Read the key from the environment variable named in `llm.api_key_env`.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, Error> {
        let api_key = std::env::var(&settings.api_key_env)
            .map_err(|_| Error::InvalidConfig(format!("environment variable {} is not set", settings.api_key_env)))?;
        Self::new(api_key, &settings.base_url, &settings.model, Duration::from_secs(settings.timeout_secs))
    }

    pub fn model(&self) -> &str { &self.model }

    pub fn build_request(&self, prompt: &str, temperature: f32) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage { role: "user".into(), content: prompt.to_string() }],
            temperature,
        }
    }
}

impl Generator for OpenAiGenerator {
    fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt, temperature))
            .send()
            .context("chat completion request failed")?;
        let status = response.status();
        let body = response.text().context("reading chat completion body")?;
        if !status.is_success() {
            return Err(anyhow!("chat completion returned {status}: {}", body.chars().take(300).collect::<String>()));
        }
        let content = parse_reply(&body)?;
        tracing::debug!(model = %self.model, elapsed_ms = start.elapsed().as_millis() as u64, chars = content.len(), "generated");
        Ok(content)
    }
}

/// Text of the first choice in a chat-completions response body.
pub fn parse_reply(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body).context("malformed chat completion response")?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| anyhow!("No content in response"))
}
