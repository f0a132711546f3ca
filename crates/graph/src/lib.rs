//! # kgmatch graph
//!
//! Typed entity/relationship graphs and the structural queries the pruning and matching
//! stages rely on.
//!
//! ## Architecture
//!
//! ```text
//! Graph JSON {"entities": [...], "relationships": [...]}
//!     │
//!     ├──> KnowledgeGraph
//!     │      ├─ Entities (unique ids, ordered attributes)
//!     │      └─ Relationships (directed, labelled, parallel edges allowed)
//!     │
//!     ├──> Projections (petgraph)
//!     │      ├─ Undirected: degree, isolation, degree centrality
//!     │      └─ Directed: relation-aware consumers
//!     │
//!     └──> GraphComparison
//!            └─ before/after counts, reduction rates, removed ids
//! ```

mod compare;
mod document;
mod error;
mod graph;
mod types;

pub use compare::{GraphComparison, GraphStats, ReductionRates, StatsDelta};
pub use error::{GraphError, Result};
pub use graph::{DirectedProjection, UndirectedProjection};
pub use types::{Attributes, Entity, KnowledgeGraph, Relationship};
