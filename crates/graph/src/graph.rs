use crate::error::{GraphError, Result};
use crate::types::{node, ExpandDirection, Expanded, ReferenceGraph};
use haste_code_chunker::{ReferenceKind, UnitId};
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};

impl ReferenceGraph {
    /// Units that `id` calls (outgoing `Call` edges)
    #[must_use]
    pub fn callees(&self, id: UnitId) -> Vec<UnitId> {
        self.edges_from(id)
            .into_iter()
            .filter(|e| e.kind == ReferenceKind::Call)
            .map(|e| e.target)
            .collect()
    }

    /// Units that call `id` (incoming `Call` edges)
    #[must_use]
    pub fn callers(&self, id: UnitId) -> Vec<UnitId> {
        self.edges_to(id)
            .into_iter()
            .filter(|e| e.kind == ReferenceKind::Call)
            .map(|e| e.source)
            .collect()
    }

    /// Definitions `id` cannot be understood without: call targets and supertypes
    #[must_use]
    pub fn required_dependencies(&self, id: UnitId) -> Vec<UnitId> {
        let mut deps: Vec<UnitId> = self
            .edges_from(id)
            .into_iter()
            .filter(|e| matches!(e.kind, ReferenceKind::Call | ReferenceKind::Inherit))
            .map(|e| e.target)
            .collect();
        deps.dedup();
        deps
    }

    /// Direct neighbours of `id` in ascending id order
    #[must_use]
    pub fn neighbors(&self, id: UnitId, direction: ExpandDirection) -> Vec<UnitId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out: Vec<UnitId> = self
            .graph
            .neighbors_directed(node(id), Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect();
        if direction == ExpandDirection::Both {
            out.extend(
                self.graph
                    .neighbors_directed(node(id), Direction::Incoming)
                    .map(|n| self.graph[n]),
            );
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Bounded breadth-first expansion from every seed at once.
    ///
    /// Each reachable unit within `max_depth` hops appears exactly once, tagged
    /// with its distance to the nearest seed. Seeds come first (hop 0, in the
    /// given order), then units in discovery order. Cycles are harmless: a unit
    /// is enqueued only the first time it is seen.
    pub fn expand(
        &self,
        seeds: &[UnitId],
        max_depth: usize,
        direction: ExpandDirection,
    ) -> Result<Vec<Expanded>> {
        let mut visited: HashMap<UnitId, usize> = HashMap::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        for &seed in seeds {
            if !self.contains(seed) {
                return Err(GraphError::UnknownUnit(seed));
            }
            if visited.insert(seed, 0).is_none() {
                order.push(Expanded { id: seed, hops: 0 });
                queue.push_back(seed);
            }
        }

        while let Some(current) = queue.pop_front() {
            let hops = visited[&current];
            if hops >= max_depth {
                continue;
            }
            for neighbor in self.neighbors(current, direction) {
                if visited.contains_key(&neighbor) {
                    continue;
                }
                visited.insert(neighbor, hops + 1);
                order.push(Expanded {
                    id: neighbor,
                    hops: hops + 1,
                });
                queue.push_back(neighbor);
            }
        }

        log::debug!(
            "Expanded {} seeds to {} units (depth {max_depth}, {direction:?})",
            seeds.len(),
            order.len()
        );

        Ok(order)
    }

    /// Graph statistics: (nodes, edges)
    #[must_use]
    pub fn stats(&self) -> (usize, usize) {
        (self.node_count(), self.edge_count())
    }
}
