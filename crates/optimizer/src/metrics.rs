use crate::error::{OptimizationError, Result};
use haste_code_chunker::{Unit, UnitId};
use haste_graph::ReferenceGraph;
use haste_search::RetrievalMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Measurements of one optimization call
///
/// Missing fields deserialize to [`OptimizerMetrics::default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerMetrics {
    pub original_tokens: usize,
    pub optimized_tokens: usize,
    pub chunks_retrieved: usize,
    pub compression_ratio: f64,
    pub latency_ms: u64,
    pub retrieval_mode: RetrievalMode,
    /// Share of required dependencies present in the output
    pub ast_fidelity: Option<f64>,
    pub budget_exceeded: bool,
}

impl Default for OptimizerMetrics {
    fn default() -> Self {
        Self {
            original_tokens: 0,
            optimized_tokens: 0,
            chunks_retrieved: 0,
            compression_ratio: 1.0,
            latency_ms: 0,
            retrieval_mode: RetrievalMode::Hybrid,
            ast_fidelity: None,
            budget_exceeded: false,
        }
    }
}

impl OptimizerMetrics {
    /// Token counts and unit count; the compression ratio is derived
    #[must_use]
    pub fn new(original_tokens: usize, optimized_tokens: usize, chunks_retrieved: usize) -> Self {
        Self {
            original_tokens,
            optimized_tokens,
            chunks_retrieved,
            compression_ratio: compression_ratio(original_tokens, optimized_tokens),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    #[must_use]
    pub const fn retrieval_mode(mut self, mode: RetrievalMode) -> Self {
        self.retrieval_mode = mode;
        self
    }

    #[must_use]
    pub const fn ast_fidelity(mut self, fidelity: Option<f64>) -> Self {
        self.ast_fidelity = fidelity;
        self
    }

    #[must_use]
    pub const fn budget_exceeded(mut self, exceeded: bool) -> Self {
        self.budget_exceeded = exceeded;
        self
    }

    /// Reject negative or non-finite ratios
    pub fn validate(&self) -> Result<()> {
        if !self.compression_ratio.is_finite() || self.compression_ratio < 0.0 {
            return Err(OptimizationError::Metrics(format!(
                "compression_ratio must be a non-negative number, got {}",
                self.compression_ratio
            )));
        }
        if let Some(fidelity) = self.ast_fidelity {
            if !(0.0..=1.0).contains(&fidelity) {
                return Err(OptimizationError::Metrics(format!(
                    "ast_fidelity must be within [0, 1], got {fidelity}"
                )));
            }
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn compression_ratio(original: usize, optimized: usize) -> f64 {
    if optimized == 0 {
        0.0
    } else {
        original as f64 / optimized as f64
    }
}

/// Fraction of required units that made it into `included`.
///
/// Required: every call or inheritance target of an included unit, plus the
/// container header of every included member. 1.0 when nothing is required.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ast_fidelity(units: &[Unit], graph: &ReferenceGraph, included: &[UnitId]) -> f64 {
    let included: BTreeSet<UnitId> = included.iter().copied().collect();
    let mut required: BTreeSet<UnitId> = BTreeSet::new();

    for &id in &included {
        required.extend(graph.required_dependencies(id));
        if let Some(unit) = units.get(id.index()) {
            required.extend(unit.parent);
        }
    }

    if required.is_empty() {
        return 1.0;
    }
    let present = required.intersection(&included).count();
    present as f64 / required.len() as f64
}

/// Optimized source plus its metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedContext {
    pub content: String,
    #[serde(default)]
    pub metrics: OptimizerMetrics,
}

impl OptimizedContext {
    #[must_use]
    pub const fn new(content: String, metrics: OptimizerMetrics) -> Self {
        Self { content, metrics }
    }

    /// (original, optimized)
    #[must_use]
    pub const fn tokens(&self) -> (usize, usize) {
        (self.metrics.original_tokens, self.metrics.optimized_tokens)
    }

    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        compression_ratio(self.metrics.original_tokens, self.metrics.optimized_tokens)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn savings_percent(&self) -> f64 {
        let (original, optimized) = self.tokens();
        if original == 0 {
            return 0.0;
        }
        (original as f64 - optimized as f64) / original as f64 * 100.0
    }

    #[must_use]
    pub const fn latency_ms(&self) -> u64 {
        self.metrics.latency_ms
    }

    #[must_use]
    pub const fn chunks_retrieved(&self) -> usize {
        self.metrics.chunks_retrieved
    }

    #[must_use]
    pub const fn ast_fidelity(&self) -> Option<f64> {
        self.metrics.ast_fidelity
    }

    /// Human-readable summary, one metric per line
    #[must_use]
    pub fn stats_report(&self) -> String {
        let (original, optimized) = self.tokens();
        let fidelity = self
            .metrics
            .ast_fidelity
            .map_or_else(|| "n/a".to_string(), |f| format!("{f:.2}"));

        let mut report = String::from("Optimization Stats:\n");
        report.push_str(&format!(" - Tokens: {original} -> {optimized}\n"));
        report.push_str(&format!(" - Compression: {:.2}x\n", self.compression_ratio()));
        report.push_str(&format!(" - Savings: {:.1}%\n", self.savings_percent()));
        report.push_str(&format!(" - Chunks Retrieved: {}\n", self.chunks_retrieved()));
        report.push_str(&format!(" - AST Fidelity: {fidelity}\n"));
        report.push_str(&format!(" - Retrieval Mode: {}\n", self.metrics.retrieval_mode));
        if self.metrics.budget_exceeded {
            report.push_str(" - Budget: exceeded by the highest-priority unit\n");
        }
        report.push_str(&format!(" - Latency: {}ms\n", self.latency_ms()));
        report
    }
}

impl fmt::Display for OptimizedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}
