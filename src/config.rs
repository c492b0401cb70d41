use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./data/index.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.pdf".to_string(),
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Window size in words.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Words shared between adjacent windows. Must be < chunk_size.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Cosine similarity below which a retrieved chunk is not used as
    /// evidence.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_min_score() -> f32 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// Turns of history included in the generation prompt.
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
    /// Turns of history folded into the retrieval query.
    #[serde(default = "default_query_history_turns")]
    pub query_history_turns: usize,
    /// Character budget for the assembled user prompt.
    #[serde(default = "default_prompt_budget_chars")]
    pub prompt_budget_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history_turns: default_max_history_turns(),
            query_history_turns: default_query_history_turns(),
            prompt_budget_chars: default_prompt_budget_chars(),
        }
    }
}

fn default_max_history_turns() -> usize {
    3
}
fn default_query_history_turns() -> usize {
    2
}
fn default_prompt_budget_chars() -> usize {
    12_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"openai"` or `"ollama"`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Fixed output dimensionality of the model.
    #[serde(default = "default_embedding_dims")]
    pub dims: usize,
    /// Endpoint override. Defaults per provider.
    #[serde(default)]
    pub url: Option<String>,
    /// Environment variable holding the API key (openai provider).
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            url: None,
            api_key_env: default_embedding_api_key_env(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_embedding_dims() -> usize {
    768
}
fn default_embedding_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// `"openai"` (any OpenAI-compatible chat endpoint, e.g. Groq) or
    /// `"ollama"`.
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Endpoint override. Defaults per provider.
    #[serde(default)]
    pub url: Option<String>,
    /// Environment variable holding the API key (openai provider).
    #[serde(default = "default_generation_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            url: None,
            api_key_env: default_generation_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_generation_retries(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "openai".to_string()
}
fn default_generation_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_generation_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.3
}
fn default_generation_retries() -> u32 {
    3
}
fn default_generation_timeout_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be < chunking.chunk_size");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(-1.0..=1.0).contains(&config.retrieval.min_score) {
        anyhow::bail!("retrieval.min_score must be in [-1.0, 1.0]");
    }
    if config.context.prompt_budget_chars == 0 {
        anyhow::bail!("context.prompt_budget_chars must be > 0");
    }
    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    match config.generation.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    for glob in &config.ingest.include_globs {
        globset::Glob::new(glob)
            .with_context(|| format!("Invalid ingest.include_globs pattern: '{}'", glob))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        validate(&Config::default()).unwrap();
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let mut config = Config::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            chunk_size = 400

            [retrieval]
            top_k = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.embedding.provider, "ollama");
    }
}
