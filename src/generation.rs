//! Generation backend abstraction and HTTP providers.
//!
//! [`Generator`] is the single seam to the text-completion service: one
//! prompt in, answer text out. Implementations:
//! - **[`OpenAiGenerator`]** - any OpenAI-compatible chat-completions
//!   endpoint (the default URL targets Groq).
//! - **[`OllamaGenerator`]** - a local Ollama instance's `/api/chat`.
//!
//! The retry strategy mirrors the embedding providers: exponential
//! backoff on 429/5xx/network errors, immediate failure on other 4xx,
//! and a per-request timeout from the configuration.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::GenerationConfig;
use crate::error::RagError;

/// Capability interface for the generation service.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce answer text for a system instruction plus user prompt.
    async fn generate(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, RagError>;
}

/// Create the appropriate [`Generator`] based on configuration.
///
/// The API key (openai provider) is read from the environment at request
/// time, so commands that never generate don't require it.
pub fn create_generator(config: &GenerationConfig) -> anyhow::Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiGenerator::new(config))),
        "ollama" => Ok(Box::new(OllamaGenerator::new(config))),
        other => anyhow::bail!("Unknown generation provider: {}", other),
    }
}

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const OLLAMA_URL: &str = "http://localhost:11434";

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt - 1).min(5))
}

// ============ OpenAI-compatible provider ============

/// Chat-completions generator for OpenAI-compatible endpoints.
pub struct OpenAiGenerator {
    model: String,
    url: String,
    api_key_env: String,
    temperature: f32,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| GROQ_CHAT_URL.to_string()),
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, RagError> {
        let api_key = std::env::var(&self.api_key_env)
            .map_err(|_| RagError::Generation(format!("{} not set", self.api_key_env)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| RagError::Generation(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.temperature,
            "max_tokens": max_tokens,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff(attempt)).await;
            }

            let resp = client
                .post(&self.url)
                .bearer_auth(&api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| RagError::Generation(e.to_string()))?;
                        return parse_chat_completion(&json);
                    }

                    let text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(status = %status, attempt, "generation request throttled or failed, retrying");
                        last_err = Some(format!("generation API error {}: {}", status, text));
                        continue;
                    }

                    return Err(RagError::Generation(format!(
                        "generation API error {}: {}",
                        status, text
                    )));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                    continue;
                }
            }
        }

        Err(RagError::Generation(
            last_err.unwrap_or_else(|| "generation failed after retries".to_string()),
        ))
    }
}

fn parse_chat_completion(json: &serde_json::Value) -> Result<String, RagError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| RagError::Generation("invalid response: missing message content".to_string()))
}

// ============ Ollama provider ============

/// Generator using a local Ollama instance's `/api/chat`.
pub struct OllamaGenerator {
    model: String,
    url: String,
    temperature: f32,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            model: config.model.clone(),
            url: config.url.clone().unwrap_or_else(|| OLLAMA_URL.to_string()),
            temperature: config.temperature,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, RagError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| RagError::Generation(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": max_tokens,
            },
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff(attempt)).await;
            }

            let resp = client
                .post(format!("{}/api/chat", self.url))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| RagError::Generation(e.to_string()))?;
                        return json
                            .get("message")
                            .and_then(|m| m.get("content"))
                            .and_then(|t| t.as_str())
                            .map(|s| s.to_string())
                            .ok_or_else(|| {
                                RagError::Generation(
                                    "invalid response: missing message content".to_string(),
                                )
                            });
                    }

                    let text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(format!("Ollama error {}: {}", status, text));
                        continue;
                    }

                    return Err(RagError::Generation(format!(
                        "Ollama error {}: {}",
                        status, text
                    )));
                }
                Err(e) => {
                    last_err = Some(format!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url, e
                    ));
                    continue;
                }
            }
        }

        Err(RagError::Generation(
            last_err.unwrap_or_else(|| "generation failed after retries".to_string()),
        ))
    }
}
