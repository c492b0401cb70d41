//! Embedding backend abstraction and HTTP providers.
//!
//! [`Embedder`] is the narrow seam between the pipeline and the embedding
//! service: one batch call in, one vector per text out. Two HTTP
//! implementations are provided:
//! - **[`OpenAiEmbedder`]** - any OpenAI-compatible `/v1/embeddings` endpoint.
//! - **[`OllamaEmbedder`]** - a local Ollama instance's `/api/embed` endpoint.
//!
//! Both retry transient failures (HTTP 429, 5xx, network errors) with
//! exponential backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5). Other
//! 4xx responses fail immediately.
//!
//! This module is also home to the vector utilities shared with the index
//! file format:
//! - [`vec_to_blob`] / [`blob_to_vec`] - little-endian f32 codec
//! - [`cosine_similarity`] - similarity between two embedding vectors

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::EmbeddingConfig;
use crate::error::RagError;

/// Capability interface for the embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Fixed output dimensionality of the embedding model.
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input, in input
    /// order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Embed a single query text.
///
/// Convenience wrapper around [`Embedder::embed`] for search-time use.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, RagError> {
    embedder
        .embed(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RagError::Embedding("empty embedding response".to_string()))
}

/// Create the appropriate [`Embedder`] based on configuration.
///
/// The API key (openai provider) is read from the environment at request
/// time, not here, so commands that never embed don't require it.
pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config))),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config))),
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    }
}

const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";
const OLLAMA_URL: &str = "http://localhost:11434";

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt - 1).min(5))
}

// ============ OpenAI-compatible provider ============

/// Embedding provider for OpenAI-compatible `/v1/embeddings` endpoints.
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    url: String,
    api_key_env: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            model: config.model.clone(),
            dims: config.dims,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_EMBED_URL.to_string()),
            api_key_env: config.api_key_env.clone(),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let api_key = std::env::var(&self.api_key_env)
            .map_err(|_| RagError::Embedding(format!("{} not set", self.api_key_env)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
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
                            .map_err(|e| RagError::Embedding(e.to_string()))?;
                        return parse_openai_embeddings(&json);
                    }

                    let text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(status = %status, attempt, "embedding request throttled or failed, retrying");
                        last_err = Some(format!("embedding API error {}: {}", status, text));
                        continue;
                    }

                    // Client error (not 429) - don't retry
                    return Err(RagError::Embedding(format!(
                        "embedding API error {}: {}",
                        status, text
                    )));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                    continue;
                }
            }
        }

        Err(RagError::Embedding(
            last_err.unwrap_or_else(|| "embedding failed after retries".to_string()),
        ))
    }
}

fn parse_openai_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RagError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| RagError::Embedding("invalid response: missing data array".to_string()))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| RagError::Embedding("invalid response: missing embedding".to_string()))?;
        embeddings.push(
            embedding
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect(),
        );
    }
    Ok(embeddings)
}

// ============ Ollama provider ============

/// Embedding provider using a local Ollama instance's `/api/embed`.
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            model: config.model.clone(),
            dims: config.dims,
            url: config.url.clone().unwrap_or_else(|| OLLAMA_URL.to_string()),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff(attempt)).await;
            }

            let resp = client
                .post(format!("{}/api/embed", self.url))
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
                            .map_err(|e| RagError::Embedding(e.to_string()))?;
                        return parse_ollama_embeddings(&json);
                    }

                    let text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(format!("Ollama error {}: {}", status, text));
                        continue;
                    }

                    return Err(RagError::Embedding(format!(
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

        Err(RagError::Embedding(
            last_err.unwrap_or_else(|| "embedding failed after retries".to_string()),
        ))
    }
}

fn parse_ollama_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RagError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            RagError::Embedding("invalid response: missing embeddings array".to_string())
        })?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| {
                RagError::Embedding("invalid response: embedding is not an array".to_string())
            })?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }
    Ok(result)
}

// ============ Vector utilities ============

/// Encode a float vector as little-endian f32 bytes.
///
/// Used by the index file format, where each vector is stored as a
/// base64-wrapped blob of `len × 4` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a blob written by [`vec_to_blob`] back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two embedding vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    let denom = norm_a * norm_b;
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_length_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
