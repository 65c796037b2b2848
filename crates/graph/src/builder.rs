use crate::error::{GraphError, Result};
use crate::types::ReferenceGraph;
use haste_code_chunker::{Reference, ReferenceKind, Unit, UnitId, UnitKind};
use std::collections::HashMap;

/// Resolves declared references to units and builds the [`ReferenceGraph`]
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphBuilder;

/// Name lookup tables over one unit set
struct NameTable<'a> {
    by_qualified: HashMap<&'a str, Vec<UnitId>>,
    by_name: HashMap<&'a str, Vec<UnitId>>,
    by_define: HashMap<&'a str, Vec<UnitId>>,
}

impl<'a> NameTable<'a> {
    fn new(units: &'a [Unit]) -> Self {
        let mut by_qualified: HashMap<&str, Vec<UnitId>> = HashMap::new();
        let mut by_name: HashMap<&str, Vec<UnitId>> = HashMap::new();
        let mut by_define: HashMap<&str, Vec<UnitId>> = HashMap::new();

        for unit in units {
            for name in &unit.defines {
                by_define.entry(name.as_str()).or_default().push(unit.id);
            }
            if matches!(unit.kind, UnitKind::ModuleStatement | UnitKind::Opaque) {
                continue;
            }
            by_qualified
                .entry(unit.qualified_name.as_str())
                .or_default()
                .push(unit.id);
            by_name.entry(unit.name.as_str()).or_default().push(unit.id);
        }

        Self {
            by_qualified,
            by_name,
            by_define,
        }
    }

    /// Qualified match first, then simple name, then module-level bindings
    fn resolve(&self, units: &[Unit], from: &Unit, reference: &Reference) -> Option<UnitId> {
        let qualified = reference
            .qualified
            .as_deref()
            .and_then(|path| self.by_qualified.get(path));
        let candidates = qualified
            .into_iter()
            .chain(self.by_name.get(reference.name.as_str()))
            .chain(
                (reference.kind != ReferenceKind::Call)
                    .then(|| self.by_define.get(reference.name.as_str()))
                    .flatten(),
            );

        for ids in candidates {
            if let Some(target) = pick(units, from, ids) {
                return Some(target);
            }
        }
        None
    }
}

/// Prefer a sibling (same owning class), then the earliest unit; never `from` itself
fn pick(units: &[Unit], from: &Unit, ids: &[UnitId]) -> Option<UnitId> {
    let mut candidates = ids.iter().copied().filter(|&id| id != from.id);
    let first = candidates.clone().next()?;
    if from.parent.is_some() {
        if let Some(sibling) = candidates.find(|id| units[id.index()].parent == from.parent) {
            return Some(sibling);
        }
    }
    Some(first)
}

impl GraphBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Build the reference graph for `units`.
    ///
    /// Unresolvable references (builtins, locals, external imports) are
    /// dropped. Class headers get a `Contains` edge to each of their methods.
    pub fn build(&self, units: &[Unit]) -> Result<ReferenceGraph> {
        for (position, unit) in units.iter().enumerate() {
            if unit.id.index() != position {
                return Err(GraphError::NonDenseIds {
                    found: unit.id,
                    position,
                });
            }
        }

        let table = NameTable::new(units);
        let mut graph = ReferenceGraph::with_units(units.len());
        let mut unresolved = 0usize;

        for unit in units {
            if let Some(parent) = unit.parent {
                graph.add_edge(parent, unit.id, ReferenceKind::Contains);
            }

            for reference in &unit.references {
                match table.resolve(units, unit, reference) {
                    Some(target) => {
                        graph.add_edge(unit.id, target, reference.kind);
                    }
                    None => unresolved += 1,
                }
            }
        }

        log::debug!(
            "Built reference graph: {} nodes, {} edges ({unresolved} unresolved references dropped)",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(graph)
    }
}
