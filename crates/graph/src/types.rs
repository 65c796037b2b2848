use haste_code_chunker::{ReferenceKind, UnitId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashSet;

/// Directed "source references target" edge between two units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ReferenceEdge {
    pub source: UnitId,
    pub target: UnitId,
    pub kind: ReferenceKind,
}

/// Which edges bounded expansion follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpandDirection {
    /// Callees, supertypes, used names, contained methods
    #[default]
    Outgoing,
    /// Outgoing plus incoming ("called-by") edges
    Both,
}

/// Unit reached by expansion, with its hop distance from the nearest seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Expanded {
    pub id: UnitId,
    pub hops: usize,
}

/// Reference graph over one unit set.
///
/// Node `i` always carries `UnitId(i)`, so unit ids index nodes directly.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    pub(crate) graph: DiGraph<UnitId, ReferenceKind>,
    edge_keys: HashSet<ReferenceEdge>,
}

impl ReferenceGraph {
    /// Graph with `unit_count` nodes and no edges
    #[must_use]
    pub fn with_units(unit_count: usize) -> Self {
        let mut graph = DiGraph::with_capacity(unit_count, unit_count * 2);
        for idx in 0..unit_count {
            graph.add_node(UnitId(idx));
        }
        Self {
            graph,
            edge_keys: HashSet::new(),
        }
    }

    /// Add an edge; returns `false` for self loops, unknown endpoints and duplicates
    pub fn add_edge(&mut self, source: UnitId, target: UnitId, kind: ReferenceKind) -> bool {
        if source == target || !self.contains(source) || !self.contains(target) {
            return false;
        }
        let key = ReferenceEdge {
            source,
            target,
            kind,
        };
        if !self.edge_keys.insert(key) {
            return false;
        }
        self.graph.add_edge(node(source), node(target), kind);
        true
    }

    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        id.index() < self.graph.node_count()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing edges of `id`, ordered by (target, kind)
    #[must_use]
    pub fn edges_from(&self, id: UnitId) -> Vec<ReferenceEdge> {
        self.collect_edges(id, Direction::Outgoing)
    }

    /// Incoming edges of `id`, ordered by (source, kind)
    #[must_use]
    pub fn edges_to(&self, id: UnitId) -> Vec<ReferenceEdge> {
        self.collect_edges(id, Direction::Incoming)
    }

    /// All edges ordered by (source, target, kind)
    #[must_use]
    pub fn edges(&self) -> Vec<ReferenceEdge> {
        let mut edges: Vec<ReferenceEdge> = self.edge_keys.iter().copied().collect();
        edges.sort();
        edges
    }

    fn collect_edges(&self, id: UnitId, direction: Direction) -> Vec<ReferenceEdge> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut edges: Vec<ReferenceEdge> = self
            .graph
            .edges_directed(node(id), direction)
            .map(|e| ReferenceEdge {
                source: self.graph[e.source()],
                target: self.graph[e.target()],
                kind: *e.weight(),
            })
            .collect();
        edges.sort_by_key(|e| match direction {
            Direction::Outgoing => (e.target, e.kind),
            Direction::Incoming => (e.source, e.kind),
        });
        edges
    }
}

pub(crate) fn node(id: UnitId) -> NodeIndex {
    NodeIndex::new(id.index())
}
