use crate::error::{Result, SearchError};
use crate::lexical::ScoredUnit;
use async_trait::async_trait;
use haste_code_chunker::Unit;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Semantic reranking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub enabled: bool,
    /// Share of the combined score taken by semantic similarity, in `[0, 1]`
    pub weight: f64,
    /// Rerank pool size as a multiple of `top_k`
    pub rerank_pool_multiplier: usize,
    pub timeout_ms: u64,
    pub model: String,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weight: 0.5,
            rerank_pool_multiplier: 3,
            timeout_ms: 2_000,
            model: "text-embedding-3-small".to_string(),
        }
    }
}

impl SemanticConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.weight) {
            return Err(SearchError::invalid_parameter(format!(
                "semantic.weight must be within [0, 1], got {}",
                self.weight
            )));
        }
        if self.rerank_pool_multiplier == 0 {
            return Err(SearchError::invalid_parameter(
                "semantic.rerank_pool_multiplier must be at least 1",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Scores query/text similarity in `[0, 1]`, one value per text
#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    async fn similarity(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>>;
}

/// Turns texts into dense vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// [`SimilarityScorer`] on top of any [`Embedder`] via cosine similarity
pub struct EmbeddingScorer<E> {
    embedder: E,
}

impl<E: Embedder> EmbeddingScorer<E> {
    pub const fn new(embedder: E) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl<E: Embedder> SimilarityScorer for EmbeddingScorer<E> {
    async fn similarity(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        let mut inputs = Vec::with_capacity(texts.len() + 1);
        inputs.push(query);
        inputs.extend_from_slice(texts);

        let vectors = self.embedder.embed(&inputs).await?;
        if vectors.len() != inputs.len() {
            return Err(SearchError::semantic_backend(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                vectors.len()
            )));
        }

        let query_vec = ArrayView1::from(vectors[0].as_slice());
        vectors[1..]
            .iter()
            .map(|v| {
                if v.len() != query_vec.len() {
                    return Err(SearchError::semantic_backend(format!(
                        "embedding dimension mismatch: {} vs {}",
                        v.len(),
                        query_vec.len()
                    )));
                }
                let cosine = cosine_similarity(query_vec, ArrayView1::from(v.as_slice()));
                Ok(((cosine + 1.0) / 2.0).clamp(0.0, 1.0))
            })
            .collect()
    }
}

fn cosine_similarity(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if norm == 0.0 {
        0.0
    } else {
        a.dot(&b) / norm
    }
}

/// Blends lexical and semantic scores for a candidate pool
#[derive(Clone)]
pub struct SemanticRanker {
    scorer: Arc<dyn SimilarityScorer>,
    weight: f64,
}

impl SemanticRanker {
    pub fn new(scorer: Arc<dyn SimilarityScorer>, weight: f64) -> Self {
        Self {
            scorer,
            weight: weight.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// `(1 - w) * lexical / max_lexical + w * semantic`
    #[must_use]
    pub fn blend(&self, lexical: f64, max_lexical: f64, semantic: Option<f64>) -> f64 {
        let lexical = if max_lexical > 0.0 {
            lexical / max_lexical
        } else {
            0.0
        };
        (1.0 - self.weight) * lexical + self.weight * semantic.unwrap_or(0.0)
    }

    /// Attach semantic scores to `candidates` and recompute `combined`.
    ///
    /// Fails with [`SearchError::SemanticBackend`] when the scorer errors,
    /// returns malformed output, or does not answer within `deadline`.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<ScoredUnit>,
        units: &[Unit],
        deadline: Duration,
    ) -> Result<Vec<ScoredUnit>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let texts: Vec<&str> = candidates
            .iter()
            .map(|c| {
                units.get(c.id.index()).map(|u| u.text.as_str()).ok_or_else(|| {
                    SearchError::invalid_parameter(format!("candidate {} is not a known unit", c.id))
                })
            })
            .collect::<Result<_>>()?;

        let similarities = tokio::time::timeout(deadline, self.scorer.similarity(query, &texts))
            .await
            .map_err(|_| {
                SearchError::semantic_backend(format!("timed out after {}ms", deadline.as_millis()))
            })?
            .map_err(|err| match err {
                SearchError::SemanticBackend(_) => err,
                other => SearchError::semantic_backend(other.to_string()),
            })?;

        if similarities.len() != candidates.len() {
            return Err(SearchError::semantic_backend(format!(
                "expected {} similarities, got {}",
                candidates.len(),
                similarities.len()
            )));
        }
        if similarities.iter().any(|s| !s.is_finite()) {
            return Err(SearchError::semantic_backend("non-finite similarity score"));
        }

        let max_lexical = candidates.iter().map(|c| c.lexical).fold(0.0f64, f64::max);
        let reranked = candidates
            .into_iter()
            .zip(similarities)
            .map(|(candidate, similarity)| {
                let semantic = f64::from(similarity.clamp(0.0, 1.0));
                ScoredUnit {
                    semantic: Some(semantic),
                    combined: self.blend(candidate.lexical, max_lexical, Some(semantic)),
                    ..candidate
                }
            })
            .collect();

        Ok(reranked)
    }
}
