use crate::error::{Result, SearchError};
use crate::lexical::{LexicalIndex, ScoredUnit};
use crate::semantic::SemanticRanker;
use haste_code_chunker::{Unit, UnitId};
use haste_graph::{ExpandDirection, ReferenceGraph};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

/// Which scoring actually produced a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    Lexical,
    Hybrid,
}

impl RetrievalMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated retrieval knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalParams {
    pub top_k: usize,
    pub traversal_depth: usize,
    pub direction: ExpandDirection,
}

impl RetrievalParams {
    /// Accepts raw signed inputs so that callers can pass user values through
    pub fn new(top_k: i64, traversal_depth: i64) -> Result<Self> {
        if top_k <= 0 {
            return Err(SearchError::invalid_parameter(format!(
                "top_k must be positive, got {top_k}"
            )));
        }
        if traversal_depth < 0 {
            return Err(SearchError::invalid_parameter(format!(
                "traversal_depth must be non-negative, got {traversal_depth}"
            )));
        }
        Ok(Self {
            top_k: usize::try_from(top_k).unwrap_or(usize::MAX),
            traversal_depth: usize::try_from(traversal_depth).unwrap_or(usize::MAX),
            direction: ExpandDirection::Outgoing,
        })
    }

    /// Also follow incoming edges (callers) during expansion
    #[must_use]
    pub const fn include_callers(mut self, include: bool) -> Self {
        self.direction = if include {
            ExpandDirection::Both
        } else {
            ExpandDirection::Outgoing
        };
        self
    }
}

/// A scored unit plus its hop distance from the nearest seed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetrievedUnit {
    pub score: ScoredUnit,
    pub hops: usize,
}

impl RetrievedUnit {
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.score.id
    }
}

/// Seeds, their graph neighbourhood, and the mode used to rank them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    pub seeds: Vec<UnitId>,
    /// Seeds first, then expansion order; each unit once
    pub units: Vec<RetrievedUnit>,
    pub mode: RetrievalMode,
}

impl Retrieval {
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

struct Reranking<'a> {
    ranker: &'a SemanticRanker,
    deadline: Duration,
    pool_multiplier: usize,
}

/// Lexical seeding, optional semantic rerank, then graph expansion
pub struct Retriever<'a> {
    units: &'a [Unit],
    graph: &'a ReferenceGraph,
    index: &'a LexicalIndex,
    reranking: Option<Reranking<'a>>,
}

impl<'a> Retriever<'a> {
    #[must_use]
    pub const fn new(units: &'a [Unit], graph: &'a ReferenceGraph, index: &'a LexicalIndex) -> Self {
        Self {
            units,
            graph,
            index,
            reranking: None,
        }
    }

    /// Rerank the top `top_k * pool_multiplier` lexical hits within `deadline`
    #[must_use]
    pub fn with_ranker(
        mut self,
        ranker: &'a SemanticRanker,
        deadline: Duration,
        pool_multiplier: usize,
    ) -> Self {
        self.reranking = Some(Reranking {
            ranker,
            deadline,
            pool_multiplier: pool_multiplier.max(1),
        });
        self
    }

    pub async fn retrieve(&self, query: &str, params: &RetrievalParams) -> Result<Retrieval> {
        let mut scored = self.index.score(query);
        let mut mode = RetrievalMode::Lexical;

        if let Some(reranking) = &self.reranking {
            if self.rerank(query, params, reranking, &mut scored).await {
                mode = RetrievalMode::Hybrid;
            }
        }

        let mut ranked = scored.clone();
        ranked.sort_by(compare_scores);
        let seeds: Vec<UnitId> = ranked.iter().take(params.top_k).map(|s| s.id).collect();

        let expanded = if seeds.is_empty() {
            Vec::new()
        } else {
            self.graph
                .expand(&seeds, params.traversal_depth, params.direction)?
        };

        let units: Vec<RetrievedUnit> = expanded
            .into_iter()
            .map(|e| RetrievedUnit {
                score: scored[e.id.index()],
                hops: e.hops,
            })
            .collect();

        log::debug!(
            "Retrieved {} units from {} seeds (depth {}, {mode})",
            units.len(),
            seeds.len(),
            params.traversal_depth
        );

        Ok(Retrieval { seeds, units, mode })
    }

    /// Blend semantic scores into `scored`; `false` when the backend failed
    async fn rerank(
        &self,
        query: &str,
        params: &RetrievalParams,
        reranking: &Reranking<'_>,
        scored: &mut [ScoredUnit],
    ) -> bool {
        let mut pool = scored.to_vec();
        pool.sort_by(|a, b| {
            b.lexical
                .partial_cmp(&a.lexical)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        pool.truncate(params.top_k.saturating_mul(reranking.pool_multiplier));

        let reranked = match reranking
            .ranker
            .rerank(query, pool, self.units, reranking.deadline)
            .await
        {
            Ok(reranked) => reranked,
            Err(err) => {
                log::warn!("Semantic rerank failed, falling back to lexical ranking: {err}");
                return false;
            }
        };

        let max_lexical = scored.iter().map(|s| s.lexical).fold(0.0f64, f64::max);
        let by_id: HashMap<UnitId, ScoredUnit> = reranked.into_iter().map(|s| (s.id, s)).collect();
        for slot in scored.iter_mut() {
            *slot = by_id.get(&slot.id).copied().unwrap_or_else(|| ScoredUnit {
                combined: reranking.ranker.blend(slot.lexical, max_lexical, None),
                ..*slot
            });
        }
        true
    }
}

/// Combined desc, then lexical desc, then id asc
fn compare_scores(a: &ScoredUnit, b: &ScoredUnit) -> Ordering {
    b.combined
        .partial_cmp(&a.combined)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.lexical.partial_cmp(&a.lexical).unwrap_or(Ordering::Equal))
        .then_with(|| a.id.cmp(&b.id))
}
