//! # kgmatch pruning
//!
//! Hybrid reduction of a knowledge graph to its load-bearing subset.
//!
//! ## Architecture
//!
//! ```text
//! raw KnowledgeGraph
//!     │
//!     ├──> TopologyPruner
//!     │      ├─ drop isolated entities
//!     │      └─ drop blacklisted types with degree <= 1
//!     │
//!     ├──> AttributeFuser (EmbeddingProvider)
//!     │      └─ per entity: drop attributes with cosine > threshold to an earlier one
//!     │
//!     └──> GraphRefiner (reasoning service, optional)
//!            └─ drop inconsistent relationships, merge co-referent entities
//! ```
//!
//! Every stage hands a well-formed graph (no dangling relationships) to the next one.
//! Service failures degrade the stage instead of aborting the run.

mod config;
mod error;
mod fusion;
mod pipeline;
mod refine;
mod topology;

pub use config::{
    FusionConfig, PruningConfig, TopologyConfig, DEFAULT_BLACKLIST, DEFAULT_FUSION_THRESHOLD,
};
pub use error::{PruningError, Result};
pub use fusion::{attribute_text, redundant_attributes, AttributeFuser, FusionOutcome};
pub use pipeline::{PrunedGraph, PruningPipeline, PruningReport};
pub use refine::{
    refine_or_keep, refinement_prompt, GraphRefiner, RefineOutcome, RefinementStatus,
    REFINEMENT_INSTRUCTIONS,
};
pub use topology::{TopologyOutcome, TopologyPruner};
