use crate::assembler::BudgetedAssembler;
use crate::config::OptimizerConfig;
use crate::error::{OptimizationError, Result};
use crate::metrics::{ast_fidelity, OptimizedContext, OptimizerMetrics};
use crate::tokens::{ApproxTokenCounter, HfTokenCounter, TokenCounter};
use haste_code_chunker::{Language, SourceParser, Unit};
use haste_graph::{GraphBuilder, ReferenceGraph};
use haste_search::{
    EmbeddingScorer, LexicalIndex, OpenAiEmbedder, RetrievalParams, Retriever, SemanticRanker,
    SimilarityScorer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// One optimization call.
///
/// `None` fields fall back to the optimizer's [`OptimizerConfig`]. Integers
/// are signed so out-of-range user input reaches validation instead of
/// wrapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeRequest {
    pub context: String,
    pub query: String,
    pub file_path: Option<PathBuf>,
    pub max_tokens: Option<i64>,
    pub top_k: Option<i64>,
    pub traversal_depth: Option<i64>,
    pub semantic: Option<bool>,
}

impl OptimizeRequest {
    pub fn new(context: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            query: query.into(),
            ..Self::default()
        }
    }

    /// Source is read from `path` at optimization time
    pub fn from_file(path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self::new(String::new(), query).file_path(path)
    }

    #[must_use]
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: i64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub const fn top_k(mut self, top_k: i64) -> Self {
        self.top_k = Some(top_k);
        self
    }

    #[must_use]
    pub const fn traversal_depth(mut self, depth: i64) -> Self {
        self.traversal_depth = Some(depth);
        self
    }

    #[must_use]
    pub const fn semantic(mut self, enabled: bool) -> Self {
        self.semantic = Some(enabled);
        self
    }
}

/// Query-driven source compression: parse, index, retrieve, assemble
pub struct HasteOptimizer {
    config: OptimizerConfig,
    scorer: Option<Arc<dyn SimilarityScorer>>,
    counter: Arc<dyn TokenCounter>,
}

impl HasteOptimizer {
    /// Build an optimizer from a validated config.
    ///
    /// With `semantic.enabled`, an OpenAI embedding backend is set up from
    /// `OPENAI_API_KEY`; without a key, semantic requests run lexical-only.
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;

        let counter: Arc<dyn TokenCounter> = match &config.assembly.tokenizer {
            Some(path) => Arc::new(HfTokenCounter::from_file(path)?),
            None => Arc::new(ApproxTokenCounter),
        };

        let scorer: Option<Arc<dyn SimilarityScorer>> = if config.semantic.enabled {
            match OpenAiEmbedder::from_env() {
                Ok(embedder) => Some(Arc::new(EmbeddingScorer::new(
                    embedder.with_model(config.semantic.model.clone()),
                ))),
                Err(err) => {
                    log::warn!("Semantic ranking unavailable: {err}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            config,
            scorer,
            counter,
        })
    }

    /// Replace the similarity backend
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Replace the token counter used for budgets and metrics
    #[must_use]
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    #[must_use]
    pub fn token_counter(&self) -> &dyn TokenCounter {
        self.counter.as_ref()
    }

    /// Compress source to the units most relevant to `request.query`
    pub async fn optimize(&self, request: OptimizeRequest) -> Result<OptimizedContext> {
        let started = Instant::now();
        let deadline = started + self.config.limits.request_timeout();

        let params = RetrievalParams::new(
            request.top_k.unwrap_or_else(|| to_i64(self.config.retrieval.top_k)),
            request
                .traversal_depth
                .unwrap_or_else(|| to_i64(self.config.retrieval.traversal_depth)),
        )?
        .include_callers(self.config.retrieval.include_callers);
        let max_tokens = match request.max_tokens {
            Some(value) => usize::try_from(value).map_err(|_| {
                OptimizationError::invalid_parameter(format!(
                    "max_tokens must be non-negative, got {value}"
                ))
            })?,
            None => self.config.assembly.max_tokens,
        };

        let source = self.load_source(&request).await?;
        if source.trim().is_empty() {
            return Err(OptimizationError::EmptyInput);
        }
        if source.len() > self.config.limits.max_source_bytes {
            return Err(OptimizationError::invalid_parameter(format!(
                "source is {} bytes, limit is {}",
                source.len(),
                self.config.limits.max_source_bytes
            )));
        }
        let language = self.resolve_language(request.file_path.as_deref());

        let source = Arc::new(source);
        let units = {
            let source = Arc::clone(&source);
            tokio::task::spawn_blocking(move || -> Result<Vec<Unit>> {
                Ok(SourceParser::new(language)?.parse(&source)?)
            })
            .await??
        };
        let units = Arc::new(units);

        let (graph, index) = self.build_structures(&units).await?;

        let use_semantic = request.semantic.unwrap_or(self.config.semantic.enabled);
        let ranker = match (&self.scorer, use_semantic) {
            (Some(scorer), true) => Some(SemanticRanker::new(
                Arc::clone(scorer),
                self.config.semantic.weight,
            )),
            (None, true) => {
                log::warn!("Semantic ranking requested but no backend is configured");
                None
            }
            _ => None,
        };

        let mut retriever = Retriever::new(&units, &graph, &index);
        if let Some(ranker) = &ranker {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let budget = remaining.min(self.config.semantic.timeout());
            retriever =
                retriever.with_ranker(ranker, budget, self.config.semantic.rerank_pool_multiplier);
        }
        let retrieval = retriever.retrieve(&request.query, &params).await?;

        let assembler = BudgetedAssembler::new(&source, language, self.counter.as_ref());
        let assembly = assembler.assemble(&units, &retrieval.units, max_tokens);

        let original_tokens = self.counter.count(&source);
        let fidelity = ast_fidelity(&units, &graph, &assembly.included);
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let metrics = OptimizerMetrics::new(original_tokens, assembly.tokens, assembly.included.len())
            .retrieval_mode(retrieval.mode)
            .ast_fidelity(Some(fidelity))
            .budget_exceeded(assembly.budget_exceeded)
            .latency_ms(latency_ms);
        metrics.validate()?;

        log::info!(
            "Optimized {} source: {original_tokens} -> {} tokens, {} units, {} mode, {latency_ms}ms",
            language,
            assembly.tokens,
            assembly.included.len(),
            retrieval.mode
        );

        Ok(OptimizedContext::new(assembly.content, metrics))
    }

    /// [`Self::optimize`] with inline source and config defaults otherwise
    pub async fn optimize_from_string(
        &self,
        source_code: &str,
        query: &str,
        max_tokens: i64,
    ) -> Result<OptimizedContext> {
        self.optimize(OptimizeRequest::new(source_code, query).max_tokens(max_tokens))
            .await
    }

    async fn load_source(&self, request: &OptimizeRequest) -> Result<String> {
        if !request.context.trim().is_empty() {
            return Ok(request.context.clone());
        }
        match &request.file_path {
            Some(path) => {
                log::debug!("Reading source from {}", path.display());
                Ok(tokio::fs::read_to_string(path).await?)
            }
            None => Err(OptimizationError::EmptyInput),
        }
    }

    fn resolve_language(&self, path: Option<&Path>) -> Language {
        path.map(Language::from_path)
            .filter(|lang| lang.supports_ast())
            .unwrap_or(self.config.language)
    }

    /// Graph and lexical index depend only on the units, so build both at once
    async fn build_structures(
        &self,
        units: &Arc<Vec<Unit>>,
    ) -> Result<(ReferenceGraph, LexicalIndex)> {
        let graph_units = Arc::clone(units);
        let index_units = Arc::clone(units);
        let bm25 = self.config.bm25;

        let (graph, index) = tokio::try_join!(
            tokio::task::spawn_blocking(move || GraphBuilder::new().build(&graph_units)),
            tokio::task::spawn_blocking(move || LexicalIndex::build(&index_units, bm25)),
        )?;

        Ok((graph?, index))
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_overrides() {
        let request = OptimizeRequest::new("def f(): pass", "f")
            .max_tokens(100)
            .top_k(2)
            .traversal_depth(0)
            .semantic(false)
            .file_path("src/f.py");
        assert_eq!(request.max_tokens, Some(100));
        assert_eq!(request.top_k, Some(2));
        assert_eq!(request.traversal_depth, Some(0));
        assert_eq!(request.semantic, Some(false));
        assert_eq!(request.file_path, Some(PathBuf::from("src/f.py")));
    }

    #[test]
    fn language_falls_back_to_config() {
        let optimizer = HasteOptimizer::new(OptimizerConfig::default()).unwrap();
        assert_eq!(
            optimizer.resolve_language(Some(Path::new("lib.rs"))),
            Language::Rust
        );
        assert_eq!(
            optimizer.resolve_language(Some(Path::new("notes.txt"))),
            Language::Python
        );
        assert_eq!(optimizer.resolve_language(None), Language::Python);
    }
}
