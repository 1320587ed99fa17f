//! Probabilistic concept hierarchies.
//!
//! # The Core Insight
//!
//! A concept tree summarizes instances at every scale at once. The root
//! describes everything; each level down describes a finer partition:
//!
//! ```text
//! Depth 0:              [Concept0: all animals]
//!                       /                     \
//! Depth 1:     [Concept3: mammals]       [Concept7: birds]
//!               /      |      \             /        \
//! Depth 2:   [dog]   [cat]   [cow]     [robin]    [crow]
//! ```
//!
//! Every concept keeps attribute-value statistics ([`AvCounts`]) for the
//! instances below it, which is what lets category utility and likelihood be
//! computed for any subtree.
//!
//! # Module Overview
//!
//! - [`ConceptTree`]: what the clustering code needs from a hierarchy
//! - [`CobwebTree`]: an arena-backed COBWEB/3 implementation
//! - [`HealthCheck`]: structural validation (no cycles, counts add up)
//!
//! Trees are arenas addressed by [`NodeId`]. Cloning a tree duplicates the
//! arena, so a clone can be split or refit without touching the original.

mod cobweb;
mod node;
mod record;
mod traits;
mod validate;
pub mod values;

pub use cobweb::{CobwebConfig, CobwebTree};
pub use node::ConceptNode;
pub use record::{instance, Instance, Value};
pub use traits::{ConceptTree, NodeId};
pub use validate::{
    validate_tree_structure, HealthCheck, HealthReport, Severity, ValidationIssue, ValidationReport,
};
pub use values::{AttrValues, AvCounts, ContinuousValue, Summary};
