use haste_code_chunker::{Language, Unit, UnitId, UnitKind};
use haste_graph::ReferenceEdge;
use haste_optimizer::{OptimizedContext, OptimizerMetrics};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct OptimizeOutput {
    pub file: PathBuf,
    pub query: String,
    pub content: String,
    pub metrics: OptimizerMetrics,
    pub savings_percent: f64,
}

impl OptimizeOutput {
    pub fn new(file: PathBuf, query: String, result: OptimizedContext) -> Self {
        let savings_percent = result.savings_percent();
        Self {
            file,
            query,
            content: result.content,
            metrics: result.metrics,
            savings_percent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnitSummary {
    pub id: UnitId,
    pub kind: UnitKind,
    pub name: String,
    pub qualified_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<UnitId>,
    pub start_line: usize,
    pub end_line: usize,
}

impl From<&Unit> for UnitSummary {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            kind: unit.kind,
            name: unit.name.clone(),
            qualified_name: unit.qualified_name.clone(),
            parent: unit.parent,
            start_line: unit.span.start_line,
            end_line: unit.span.end_line,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnitsOutput {
    pub file: PathBuf,
    pub language: Language,
    pub units: Vec<UnitSummary>,
    pub edges: Vec<ReferenceEdge>,
}

impl UnitsOutput {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} ({}): {} units, {} edges",
            self.file.display(),
            self.language,
            self.units.len(),
            self.edges.len()
        );
        for unit in &self.units {
            let _ = writeln!(
                out,
                "{:>4}  {:<8} {:<32} L{}-{}",
                unit.id.to_string(),
                unit.kind.as_str(),
                unit.qualified_name,
                unit.start_line,
                unit.end_line
            );
        }
        if !self.edges.is_empty() {
            out.push_str("\nreferences:\n");
        }
        for edge in &self.edges {
            let _ = writeln!(
                out,
                "  {} -> {} ({})",
                edge.source,
                edge.target,
                edge.kind.as_str()
            );
        }
        out
    }
}
