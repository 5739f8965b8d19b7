//! Configuration loading.
//!
//! The TOML file holds paths, endpoints and tuning knobs. Credentials are
//! read from the environment by [`CrmCredentials::from_env`] and
//! [`EmbeddingConfig::api_key`] so they never land in a checked-in file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub crm: CrmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrmConfig {
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            accounts_url: default_accounts_url(),
            api_url: default_api_url(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_accounts_url() -> String {
    "https://accounts.zoho.com".to_string()
}
fn default_api_url() -> String {
    "https://www.zohoapis.com/crm/v2".to_string()
}
fn default_page_size() -> u32 {
    200
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_embedding_url")]
    pub url: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dims: default_dims(),
            url: default_embedding_url(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_embedding_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    1000
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// The provider API key, read from `OPENAI_API_KEY`.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        require_env("OPENAI_API_KEY")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Pull text out of DOCX and PDF attachments instead of placeholders.
    #[serde(default)]
    pub extract_documents: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            interval_hours: default_interval_hours(),
            workers: default_workers(),
            extract_documents: false,
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./data/consultants.json")
}
fn default_interval_hours() -> u64 {
    24
}
fn default_workers() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            min_similarity: default_min_similarity(),
        }
    }
}

fn default_limit() -> usize {
    consultant_index_core::search::DEFAULT_LIMIT
}
fn default_min_similarity() -> f32 {
    consultant_index_core::search::DEFAULT_MIN_SIMILARITY
}

/// Zoho OAuth client credentials.
#[derive(Clone)]
pub struct CrmCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for CrmCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl CrmCredentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: require_env("ZOHO_CLIENT_ID")?,
            client_secret: require_env("ZOHO_CLIENT_SECRET")?,
            refresh_token: require_env("ZOHO_REFRESH_TOKEN")?,
        })
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::Invalid(msg));

    if !(1..=200).contains(&config.crm.page_size) {
        return invalid("crm.page_size must be in 1..=200".to_string());
    }
    if config.sync.workers == 0 {
        return invalid("sync.workers must be >= 1".to_string());
    }
    if config.sync.interval_hours == 0 {
        return invalid("sync.interval_hours must be >= 1".to_string());
    }
    if config.search.default_limit == 0 {
        return invalid("search.default_limit must be >= 1".to_string());
    }
    if !(-1.0..=1.0).contains(&config.search.min_similarity) {
        return invalid("search.min_similarity must be in [-1.0, 1.0]".to_string());
    }

    match config.embedding.provider.as_str() {
        "disabled" => {}
        "openai" => {
            if config.embedding.dims == 0 {
                return invalid("embedding.dims must be > 0".to_string());
            }
            if config.embedding.max_attempts == 0 {
                return invalid("embedding.max_attempts must be >= 1".to_string());
            }
        }
        other => {
            return invalid(format!(
                "Unknown embedding provider: '{}'. Must be disabled or openai.",
                other
            ))
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cidx.toml");
        std::fs::write(&path, toml_src)?;
        load_config(&path)
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse("[db]\npath = \"./data/cidx.sqlite\"\n").unwrap();
        assert_eq!(config.crm.page_size, 200);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.embedding.max_attempts, 3);
        assert!(!config.embedding.is_enabled());
        assert_eq!(config.sync.interval_hours, 24);
        assert_eq!(config.search.default_limit, 10);
        assert!((config.search.min_similarity - 0.7).abs() < 1e-6);
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = parse("[db]\npath = \"x\"\n[embedding]\nprovider = \"magic\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn rejects_oversized_page() {
        let err = parse("[db]\npath = \"x\"\n[crm]\npage_size = 500\n").unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(parse("[db]\npath = \"x\"\n[sync]\nworkers = 0\n").is_err());
    }

    #[test]
    fn missing_file_has_context() {
        let err = load_config(Path::new("/nonexistent/cidx.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
