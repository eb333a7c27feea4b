//! OpenAI-compatible chat-completions generator

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{random_topic, system_prompt, user_prompt, QuoteGenerator};
use crate::config::GeneratorConfig;
use crate::error::{ConfigError, GenerationError, Result};
use crate::quotes::Quote;

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

pub struct ChatCompletionGenerator {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    persona: String,
    temperature: f32,
    max_tokens: u32,
    max_chars: usize,
}

impl ChatCompletionGenerator {
    /// Build from the `[generator]` section
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` when no API key is configured.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|key| SecretString::from(key.expose_secret().to_string()))
            .ok_or_else(|| ConfigError::MissingField("generator.api_key".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(GenerationError::from)?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            persona: config.persona.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_chars: config.max_chars,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn request_body(&self, topic: &str) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(&self.persona),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(&self.persona, topic, self.max_chars),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Turn a non-2xx body into an API error, preferring `error.message`
fn api_error(status: u16, text: String) -> GenerationError {
    let message = match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(v) => v["error"]["message"]
            .as_str()
            .map(String::from)
            .unwrap_or(text),
        Err(_) => text,
    };

    GenerationError::Api { status, message }
}

fn extract_quote(data: &serde_json::Value) -> std::result::Result<Quote, GenerationError> {
    let content = data["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(GenerationError::EmptyResponse)?;

    Quote::new(content).ok_or(GenerationError::EmptyResponse)
}

#[async_trait]
impl QuoteGenerator for ChatCompletionGenerator {
    async fn generate(&self) -> std::result::Result<Quote, GenerationError> {
        let topic = random_topic();
        debug!("Generating quote with model {} on topic '{}'", self.model, topic);

        let response = self
            .client
            .post(self.url("/chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(topic))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(api_error(status.as_u16(), text));
        }

        let data: serde_json::Value = response.json().await?;
        let quote = extract_quote(&data)?;

        debug!("Generated {} character quote", quote.char_count());
        Ok(quote)
    }
}
