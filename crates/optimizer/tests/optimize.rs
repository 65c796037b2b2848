//! End-to-end optimization behaviour

use async_trait::async_trait;
use haste_optimizer::{
    ApproxTokenCounter, HasteOptimizer, OptimizationError, OptimizeRequest, OptimizerConfig,
    RetrievalMode, TokenCounter,
};
use haste_search::{SearchError, SimilarityScorer};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::Arc;

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

const PROCESSOR_CODE: &str = r#"import statistics

def calculate_sum(numbers):
    """Calculate sum of numbers."""
    total = 0
    for num in numbers:
        total += num
    return total

def calculate_average(numbers):
    """Calculate average of numbers."""
    if len(numbers) == 0:
        return 0
    return calculate_sum(numbers) / len(numbers)

def process_data(data):
    cleaned = [x for x in data if x is not None]
    return {"sum": calculate_sum(cleaned), "average": calculate_average(cleaned)}

class DataProcessor:
    """Data processing class."""

    def __init__(self, data):
        self.data = data

    def process(self):
        return process_data(self.data)

    def get_statistics(self):
        stats = self.process()
        return {"mean": stats["average"]}
"#;

fn optimizer() -> HasteOptimizer {
    HasteOptimizer::new(OptimizerConfig::default()).unwrap()
}

fn scenario_request() -> OptimizeRequest {
    OptimizeRequest::new(STATS_CODE, "average function")
        .top_k(1)
        .traversal_depth(1)
        .semantic(false)
}

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
        Err(SearchError::semantic_backend("service unavailable"))
    }
}

/// One token per non-whitespace character
struct CharCounter;

impl TokenCounter for CharCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().filter(|c| !c.is_whitespace()).count()
    }

    fn name(&self) -> &str {
        "chars"
    }
}

#[tokio::test]
async fn test_average_pulls_in_sum() {
    let result = optimizer().optimize(scenario_request()).await.unwrap();

    assert_eq!(
        result.content,
        "def sum(numbers):\n    total = 0\n    for n in numbers:\n        total += n\n    return total\n\n\
         def average(numbers):\n    return sum(numbers) / len(numbers)"
    );
    assert_eq!(result.chunks_retrieved(), 2);
    assert!(!result.content.contains("median"));
    assert!(!result.content.contains("variance"));
    assert_eq!(result.metrics.retrieval_mode, RetrievalMode::Lexical);
    assert_eq!(result.ast_fidelity(), Some(1.0));
}

#[tokio::test]
async fn test_zero_top_k_is_rejected() {
    let err = optimizer()
        .optimize(scenario_request().top_k(0))
        .await
        .unwrap_err();
    assert!(matches!(err, OptimizationError::InvalidParameter(_)));
}

#[tokio::test]
async fn test_negative_parameters_are_rejected() {
    for request in [
        scenario_request().traversal_depth(-1),
        scenario_request().max_tokens(-10),
        scenario_request().top_k(-2),
    ] {
        let err = optimizer().optimize(request).await.unwrap_err();
        assert!(matches!(err, OptimizationError::InvalidParameter(_)), "{err}");
    }
}

#[tokio::test]
async fn test_empty_source_is_an_error() {
    for source in ["", "   \n\t\n"] {
        let err = optimizer()
            .optimize_from_string(source, "anything", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, OptimizationError::EmptyInput));
    }
}

#[tokio::test]
async fn test_metrics_match_content() {
    let result = optimizer()
        .optimize_from_string(PROCESSOR_CODE, "Find the DataProcessor class", 400)
        .await
        .unwrap();

    let (original, optimized) = result.tokens();
    assert_eq!(original, ApproxTokenCounter.count(PROCESSOR_CODE));
    assert_eq!(optimized, ApproxTokenCounter.count(&result.content));
    assert!(optimized <= 400);
    assert!(!result.content.is_empty());

    #[allow(clippy::cast_precision_loss)]
    let ratio = original as f64 / optimized as f64;
    assert!((result.compression_ratio() - ratio).abs() < 1e-9);
    assert!((result.metrics.compression_ratio - ratio).abs() < 1e-9);

    #[allow(clippy::cast_precision_loss)]
    let savings = (original as f64 - optimized as f64) / original as f64 * 100.0;
    assert!((result.savings_percent() - savings).abs() < 1e-9);
}

#[tokio::test]
async fn test_class_query_keeps_methods_with_header() {
    let result = optimizer()
        .optimize_from_string(PROCESSOR_CODE, "DataProcessor statistics", 1000)
        .await
        .unwrap();

    assert!(result.content.contains("class DataProcessor:"));
    assert!(result.content.contains("def get_statistics(self):"));
}

#[tokio::test]
async fn test_repeated_calls_are_identical() {
    let optimizer = optimizer();
    let first = optimizer.optimize(scenario_request()).await.unwrap();
    let second = optimizer.optimize(scenario_request()).await.unwrap();

    assert_eq!(first.content, second.content);
    assert_eq!(first.tokens(), second.tokens());
    assert_eq!(first.chunks_retrieved(), second.chunks_retrieved());
    assert_eq!(first.ast_fidelity(), second.ast_fidelity());
}

#[tokio::test]
async fn test_deeper_traversal_never_retrieves_less() {
    let optimizer = optimizer();
    let mut previous = 0;
    for depth in 0..4 {
        let result = optimizer
            .optimize(
                OptimizeRequest::new(PROCESSOR_CODE, "get_statistics")
                    .top_k(1)
                    .traversal_depth(depth),
            )
            .await
            .unwrap();
        assert!(result.chunks_retrieved() >= previous);
        previous = result.chunks_retrieved();
    }
    assert!(previous > 2);
}

#[tokio::test]
async fn test_budget_is_respected_when_satisfiable() {
    let optimizer = optimizer();
    let seed_only = optimizer
        .optimize(scenario_request().traversal_depth(0))
        .await
        .unwrap();
    let seed_tokens = seed_only.tokens().1;

    for budget in [seed_tokens, seed_tokens + 5, seed_tokens * 3] {
        let result = optimizer
            .optimize(scenario_request().max_tokens(i64::try_from(budget).unwrap()))
            .await
            .unwrap();
        assert!(result.tokens().1 <= budget);
        assert!(!result.metrics.budget_exceeded);
    }
}

#[tokio::test]
async fn test_tiny_budget_still_returns_best_unit() {
    let result = optimizer()
        .optimize(scenario_request().max_tokens(1))
        .await
        .unwrap();

    assert!(result.content.starts_with("def average"));
    assert_eq!(result.chunks_retrieved(), 1);
    assert!(result.metrics.budget_exceeded);
    assert!(result.stats_report().contains("Budget: exceeded"));
}

#[tokio::test]
async fn test_reads_source_from_file() {
    let mut file = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
    file.write_all(STATS_CODE.as_bytes()).unwrap();

    let inline = optimizer().optimize(scenario_request()).await.unwrap();
    let from_file = optimizer()
        .optimize(
            OptimizeRequest::from_file(file.path(), "average function")
                .top_k(1)
                .traversal_depth(1),
        )
        .await
        .unwrap();

    assert_eq!(from_file.content, inline.content);
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let err = optimizer()
        .optimize(OptimizeRequest::from_file("/nonexistent/stats.py", "average"))
        .await
        .unwrap_err();
    assert!(matches!(err, OptimizationError::Io(_)));
}

#[tokio::test]
async fn test_rust_source_by_extension() {
    let code = "fn parse_header(line: &str) -> usize {\n    line.len()\n}\n\n\
                fn render(value: usize) -> String {\n    value.to_string()\n}\n\n\
                fn load(input: &str) -> usize {\n    parse_header(input)\n}\n";
    let mut file = tempfile::Builder::new().suffix(".rs").tempfile().unwrap();
    file.write_all(code.as_bytes()).unwrap();

    let result = optimizer()
        .optimize(
            OptimizeRequest::from_file(file.path(), "load input")
                .top_k(1)
                .traversal_depth(1),
        )
        .await
        .unwrap();

    assert!(result.content.contains("fn load"));
    assert!(result.content.contains("fn parse_header"));
    assert!(!result.content.contains("fn render"));
    assert!(result.content.contains("// ..."));
}

#[tokio::test]
async fn test_rust_method_hit_keeps_braces_balanced() {
    let code = r"struct Cache;

impl Cache {
    fn lookup_entry(&self) -> u32 {
        1
    }

    fn evict_oldest(&self) -> u32 {
        2
    }
}

fn unrelated() -> u32 {
    3
}
";
    let mut file = tempfile::Builder::new().suffix(".rs").tempfile().unwrap();
    file.write_all(code.as_bytes()).unwrap();

    let result = optimizer()
        .optimize(
            OptimizeRequest::from_file(file.path(), "evict oldest")
                .top_k(1)
                .traversal_depth(0),
        )
        .await
        .unwrap();

    assert_eq!(
        result.content,
        "impl Cache {\n// ...\n    fn evict_oldest(&self) -> u32 {\n        2\n    }\n}"
    );
    assert_eq!(
        result.content.matches('{').count(),
        result.content.matches('}').count()
    );
}

#[tokio::test]
async fn test_broken_source_degrades_to_whole_file() {
    let broken = "def broken(:\n    return )\n";
    let result = optimizer()
        .optimize_from_string(broken, "broken", 1000)
        .await
        .unwrap();

    assert_eq!(result.content, broken);
    assert_eq!(result.chunks_retrieved(), 1);
}

#[tokio::test]
async fn test_semantic_failure_falls_back_to_lexical() {
    let lexical = optimizer().optimize(scenario_request()).await.unwrap();
    let degraded = optimizer()
        .with_scorer(Arc::new(FailingScorer))
        .optimize(scenario_request().semantic(true))
        .await
        .unwrap();

    assert_eq!(degraded.metrics.retrieval_mode, RetrievalMode::Lexical);
    assert_eq!(degraded.content, lexical.content);
}

#[tokio::test]
async fn test_semantic_scorer_produces_hybrid_ranking() {
    let mut config = OptimizerConfig::default();
    config.semantic.weight = 1.0;
    config.semantic.rerank_pool_multiplier = 4;

    let result = HasteOptimizer::new(config)
        .unwrap()
        .with_scorer(Arc::new(MarkerScorer("sorted")))
        .optimize(scenario_request().semantic(true))
        .await
        .unwrap();

    assert_eq!(result.metrics.retrieval_mode, RetrievalMode::Hybrid);
    assert!(result.content.starts_with("def median"));
}

#[tokio::test]
async fn test_semantic_without_backend_is_lexical() {
    let result = optimizer()
        .optimize(scenario_request().semantic(true))
        .await
        .unwrap();
    assert_eq!(result.metrics.retrieval_mode, RetrievalMode::Lexical);
}

#[tokio::test]
async fn test_custom_token_counter_drives_budget() {
    let result = optimizer()
        .with_token_counter(Arc::new(CharCounter))
        .optimize(scenario_request().max_tokens(200))
        .await
        .unwrap();

    assert_eq!(result.tokens().1, CharCounter.count(&result.content));
    assert!(result.tokens().1 <= 200);
}
