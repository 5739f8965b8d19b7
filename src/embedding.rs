//! Embedding providers.
//!
//! Implements the core [`Embedder`] trait for:
//! - **[`OpenAIEmbedder`]**: calls an OpenAI-compatible `POST {url}/embeddings`
//!   endpoint with truncation, retry, and backoff.
//! - **[`DisabledEmbedder`]**: never produces a vector; used when
//!   `embedding.provider = "disabled"`.
//!
//! # Retry Strategy
//!
//! Every failure (network error, timeout, non-2xx status, malformed body) is
//! transient. The client makes up to `max_attempts` attempts, sleeping
//! `backoff_base_ms × 2^(n-1)` before attempt `n + 1`: 1s then 2s with the
//! defaults. Sleeps block only the calling task.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use consultant_index_core::canonical::{truncate_chars, CANONICAL_TEXT_BUDGET};
use consultant_index_core::embedding::{EmbedOutcome, Embedder};

use crate::config::EmbeddingConfig;

// ============ Disabled Provider ============

/// An embedder that never produces a vector.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }

    async fn embed(&self, text: &str) -> EmbedOutcome {
        if text.trim().is_empty() {
            return EmbedOutcome::NoText;
        }
        EmbedOutcome::Failed("embedding provider is disabled".to_string())
    }
}

// ============ OpenAI Provider ============

/// Embedding client for the OpenAI embeddings API.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dims: usize,
    max_attempts: u32,
    backoff_base: Duration,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            dims: config.dims,
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        })
    }

    async fn attempt(&self, input: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": input,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("embedding API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        let vec = parse_embedding_response(&json)?;
        if self.dims > 0 && vec.len() != self.dims {
            bail!(
                "embedding has {} dimensions, expected {}",
                vec.len(),
                self.dims
            );
        }
        Ok(vec)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> EmbedOutcome {
        if text.trim().is_empty() {
            return EmbedOutcome::NoText;
        }
        let input = truncate_chars(text, CANONICAL_TEXT_BUDGET);

        let mut last_err = String::new();
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                // Exponential backoff: base, 2×base, 4×base, ...
                let delay = self.backoff_base * (1u32 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            match self.attempt(input).await {
                Ok(vec) => {
                    debug!(attempt = attempt + 1, dims = vec.len(), "embedding generated");
                    return EmbedOutcome::Embedded(vec);
                }
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "embedding attempt failed"
                    );
                    last_err = e.to_string();
                }
            }
        }

        EmbedOutcome::Failed(last_err)
    }
}

/// Extract `data[0].embedding` from an embeddings API response.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embedding response: missing data[0].embedding"))?;

    embedding
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow::anyhow!("Invalid embedding response: non-numeric value"))
        })
        .collect()
}

/// Create the [`Embedder`] selected by configuration.
///
/// | Config Value | Embedder |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] (requires `OPENAI_API_KEY`) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => {
            let api_key = config.api_key()?;
            Ok(Arc::new(OpenAIEmbedder::new(config, api_key)?))
        }
        other => bail!("Unknown embedding provider: {}", other),
    }
}
