//! Configuration loader and path helpers.
//!
//! Uses Figment to merge typed defaults + `config.toml` + `config.<env>.toml` +
//! `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_RETRIEVAL__DEFAULT_K=8`). Provides helpers to expand `~` and `${VAR}`
//! and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::debug!(env = other, "no environment overlay for RUST_ENV"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    /// Wrap an already-assembled figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract::<Settings>()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub validation: ValidationSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub monitoring: MonitoringSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.default_k == 0 || r.max_k == 0 {
            return Err(Error::InvalidConfig("retrieval.default_k and retrieval.max_k must be positive".into()));
        }
        if r.lexical_weight < 0.0 || r.semantic_weight < 0.0 {
            return Err(Error::InvalidConfig("retrieval weights must be non-negative".into()));
        }
        if r.personal_boost < 1.0 {
            return Err(Error::InvalidConfig(format!("retrieval.personal_boost must be >= 1.0, got {}", r.personal_boost)));
        }
        if self.chunking.chunk_size == 0 || self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidConfig("chunking.chunk_overlap must be smaller than a non-zero chunk_size".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::InvalidConfig("llm.temperature must be within 0.0..=2.0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// General insurance guides; ingested as `general` class.
    pub general_docs_dir: String,
    /// The user's own policies; ingested as `personal` class.
    pub personal_docs_dir: String,
    pub lexical_index_dir: String,
    pub vector_db_dir: String,
    pub table_name: String,
    pub supported_policy_types: Vec<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            general_docs_dir: "data/default_insurance_docs".into(),
            personal_docs_dir: "data/insurance_policies".into(),
            lexical_index_dir: "vectordb/lexical".into(),
            vector_db_dir: "vectordb/lancedb".into(),
            table_name: "insurance_policies".into(),
            supported_policy_types: ["homeowners", "auto", "commercial", "umbrella", "renters", "health", "life", "travel", "motor"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self { Self { chunk_size: 1500, chunk_overlap: 200 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_k: usize,
    pub max_k: usize,
    pub compare_k_per_type: usize,
    pub hybrid_enabled: bool,
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    pub personal_boost: f32,
    pub min_relevance_score: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            default_k: 6,
            max_k: 10,
            compare_k_per_type: 4,
            hybrid_enabled: true,
            lexical_weight: 0.5,
            semantic_weight: 0.5,
            personal_boost: 1.5,
            min_relevance_score: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub enable_faithfulness_check: bool,
    /// Context characters shown to the fact-checker.
    pub faithfulness_context_chars: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self { Self { enable_faithfulness_check: true, faithfulness_context_chars: 3000 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// `local` (BGE-M3 through Candle) or `hash` (deterministic, model-free).
    pub provider: String,
    pub model_dir: Option<String>,
    pub dim: usize,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self { Self { provider: "local".into(), model_dir: None, dim: 1024, max_len: 256, batch_size: 32 } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub enabled: bool,
    /// JSON-lines query log; `None` logs through tracing only.
    pub log_path: Option<String>,
}

impl Default for MonitoringSettings {
    fn default() -> Self { Self { enabled: true, log_path: Some("monitoring/queries.jsonl".into()) } }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
