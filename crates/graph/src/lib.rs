//! # HASTE Graph
//!
//! Reference graph over parsed units and bounded expansion from seed units.
//!
//! ## Architecture
//!
//! ```text
//! Unit[]
//!     │
//!     ├──> Graph Builder
//!     │      ├─ Resolve references (qualified name, then simple name)
//!     │      ├─ Drop unresolved names (builtins, locals, external imports)
//!     │      └─ Add class -> method containment
//!     │
//!     └──> Reference Graph (petgraph)
//!            ├─ Nodes: units, node index == unit id
//!            ├─ Edges: call / inherit / import / contains
//!            └─ Multi-source BFS with a visited map (cycle safe)
//! ```

mod builder;
mod error;
mod graph;
mod types;

pub use builder::GraphBuilder;
pub use error::{GraphError, Result};
pub use types::{ExpandDirection, Expanded, ReferenceEdge, ReferenceGraph};
