//! End-to-end retrieval over parsed units

use async_trait::async_trait;
use haste_code_chunker::{parse_source, Language, Unit, UnitId};
use haste_graph::{GraphBuilder, ReferenceGraph};
use haste_search::{
    Bm25Config, LexicalIndex, RetrievalMode, RetrievalParams, Retriever, SearchError,
    SemanticRanker, SimilarityScorer,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const STATS_CODE: &str = r"def sum(numbers):
    total = 0
    for n in numbers:
        total += n
    return total

def average(numbers):
    return sum(numbers) / len(numbers)

def median(numbers):
    ordered = sorted(numbers)
    return ordered[len(ordered) // 2]

def variance(numbers):
    mean = average(numbers)
    return sum([(x - mean) ** 2 for x in numbers]) / len(numbers)
";

struct Fixture {
    units: Vec<Unit>,
    graph: ReferenceGraph,
    index: LexicalIndex,
}

fn fixture() -> Fixture {
    let units = parse_source(STATS_CODE, Language::Python).unwrap();
    let graph = GraphBuilder::new().build(&units).unwrap();
    let index = LexicalIndex::build(&units, Bm25Config::default());
    Fixture {
        units,
        graph,
        index,
    }
}

fn sorted_ids(retrieval: &haste_search::Retrieval) -> Vec<UnitId> {
    let mut ids: Vec<UnitId> = retrieval.units.iter().map(|u| u.id()).collect();
    ids.sort();
    ids
}

/// Prefers texts containing a marker word
struct MarkerScorer(&'static str);

#[async_trait]
impl SimilarityScorer for MarkerScorer {
    async fn similarity(&self, _query: &str, texts: &[&str]) -> haste_search::Result<Vec<f32>> {
        Ok(texts
            .iter()
            .map(|t| if t.contains(self.0) { 1.0 } else { 0.0 })
            .collect())
    }
}

struct FailingScorer;

#[async_trait]
impl SimilarityScorer for FailingScorer {
    async fn similarity(&self, _query: &str, _texts: &[&str]) -> haste_search::Result<Vec<f32>> {
        Err(SearchError::semantic_backend("connection refused"))
    }
}

#[tokio::test]
async fn test_seed_and_one_hop_callee() {
    let fx = fixture();
    let retriever = Retriever::new(&fx.units, &fx.graph, &fx.index);
    let params = RetrievalParams::new(1, 1).unwrap();

    let retrieval = retriever.retrieve("average function", &params).await.unwrap();

    assert_eq!(retrieval.seeds, vec![UnitId(1)]);
    assert_eq!(sorted_ids(&retrieval), vec![UnitId(0), UnitId(1)]);
    assert_eq!(retrieval.units[0].hops, 0);
    assert_eq!(retrieval.units[1].hops, 1);
    assert_eq!(retrieval.mode, RetrievalMode::Lexical);
}

#[tokio::test]
async fn test_depth_zero_returns_seeds_only() {
    let fx = fixture();
    let retriever = Retriever::new(&fx.units, &fx.graph, &fx.index);
    let params = RetrievalParams::new(2, 0).unwrap();

    let retrieval = retriever.retrieve("variance", &params).await.unwrap();

    assert_eq!(retrieval.len(), 2);
    assert_eq!(retrieval.seeds[0], UnitId(3));
    assert!(retrieval.units.iter().all(|u| u.hops == 0));
}

#[tokio::test]
async fn test_deeper_traversal_never_shrinks_result() {
    let fx = fixture();
    let retriever = Retriever::new(&fx.units, &fx.graph, &fx.index);

    let mut previous = 0;
    for depth in 0..4 {
        let params = RetrievalParams::new(1, depth).unwrap();
        let retrieval = retriever.retrieve("variance", &params).await.unwrap();
        assert!(retrieval.len() >= previous);
        previous = retrieval.len();
    }
    assert_eq!(previous, 3);
}

#[tokio::test]
async fn test_semantic_rerank_changes_seed() {
    let fx = fixture();
    let ranker = SemanticRanker::new(Arc::new(MarkerScorer("sorted")), 1.0);
    let retriever = Retriever::new(&fx.units, &fx.graph, &fx.index).with_ranker(
        &ranker,
        Duration::from_secs(1),
        4,
    );
    let params = RetrievalParams::new(1, 1).unwrap();

    let retrieval = retriever.retrieve("average", &params).await.unwrap();

    assert_eq!(retrieval.mode, RetrievalMode::Hybrid);
    assert_eq!(retrieval.seeds, vec![UnitId(2)]);
    assert_eq!(retrieval.units[0].score.semantic, Some(1.0));
}

#[tokio::test]
async fn test_semantic_failure_degrades_to_lexical() {
    let fx = fixture();
    let ranker = SemanticRanker::new(Arc::new(FailingScorer), 0.5);
    let params = RetrievalParams::new(1, 1).unwrap();

    let lexical = Retriever::new(&fx.units, &fx.graph, &fx.index)
        .retrieve("average function", &params)
        .await
        .unwrap();
    let degraded = Retriever::new(&fx.units, &fx.graph, &fx.index)
        .with_ranker(&ranker, Duration::from_secs(1), 3)
        .retrieve("average function", &params)
        .await
        .unwrap();

    assert_eq!(degraded.mode, RetrievalMode::Lexical);
    assert_eq!(degraded, lexical);
}

#[tokio::test]
async fn test_retrieval_is_deterministic() {
    let fx = fixture();
    let retriever = Retriever::new(&fx.units, &fx.graph, &fx.index);
    let params = RetrievalParams::new(2, 2).unwrap();

    let first = retriever.retrieve("numbers total", &params).await.unwrap();
    let second = retriever.retrieve("numbers total", &params).await.unwrap();
    assert_eq!(first, second);
}
