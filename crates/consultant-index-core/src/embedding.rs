//! Embedding trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! the tri-state [`EmbedOutcome`] it returns, and pure helpers for vector
//! serialization and similarity computation.
//!
//! Concrete clients (the OpenAI-compatible HTTP client with retry and
//! backoff) live in the `consultant-index` app crate.

use async_trait::async_trait;

/// Result of a single embedding request.
///
/// `NoText` is an expected no-op for empty input; `Failed` is counted in
/// sync statistics.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedOutcome {
    /// The provider returned a vector.
    Embedded(Vec<f32>),
    /// The input was empty; nothing was sent.
    NoText,
    /// Every attempt failed; carries the last error.
    Failed(String),
}

impl EmbedOutcome {
    /// The vector, if one was produced.
    pub fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            EmbedOutcome::Embedded(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, EmbedOutcome::Failed(_))
    }
}

/// An embedding backend.
///
/// Implementations never cache: every call is an independent request.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-ada-002"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed one text.
    async fn embed(&self, text: &str) -> EmbedOutcome;
}

/// Embedding column encoding: 4 little-endian bytes per value.
///
/// ```rust
/// use consultant_index_core::embedding::{blob_to_vec, vec_to_blob};
///
/// let blob = vec_to_blob(&[0.5, -1.0]);
/// assert_eq!(blob.len(), 8);
/// assert_eq!(blob_to_vec(&blob), vec![0.5, -1.0]);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a BLOB written by [`vec_to_blob`]. A trailing partial value is
/// ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .filter_map(|chunk| chunk.try_into().ok().map(f32::from_le_bytes))
        .collect()
}

/// Cosine similarity of two vectors, clamped to `[-1.0, 1.0]`.
///
/// Mismatched lengths, empty or zero-norm vectors and non-finite values
/// all score `0.0`, so a damaged stored vector never outranks a real match.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    let denom = (norm_a * norm_b).sqrt();
    if !denom.is_finite() || denom < f32::EPSILON {
        return 0.0;
    }
    let sim = dot / denom;
    if sim.is_finite() {
        sim.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
