//! Embedding provider seam for similarity computation.

use async_trait::async_trait;

use crate::domain::errors::{DomainError, DomainResult};

/// Produces one embedding vector per input text.
///
/// Clustering prefers embedding cosine similarity and falls back to token
/// overlap when the provider is unavailable, so this seam failing never
/// breaks clustering.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>>;
}

/// Provider for configurations without an embedding backend.
pub struct NullEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    async fn embed(&self, _texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        Err(DomainError::ModelUnavailable(
            "no embedding provider configured".to_string(),
        ))
    }
}

/// Cosine similarity between two embedding vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    f64::from(dot / (norm_a * norm_b))
}
