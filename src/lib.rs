//! # cobweb-cuts
//!
//! Multi-resolution flat clusterings read off COBWEB concept hierarchies.
//!
//! A COBWEB tree organizes instances into concepts at every granularity. This
//! crate cuts it into flat clusterings by repeatedly splitting the top-level
//! concept whose split gains the most category utility, and can pick the
//! number of splits with AIC, AICc or BIC.
//!
//! ```text
//!   instances ──► CobwebTree ──► SplitIter ──► clusterings at 1, 2, 3.. splits
//!                                     │
//!                                     └──► cluster_split_search ──► best clustering
//! ```
//!
//! ## Modules
//!
//! - [`tree`]: instances, attribute statistics and the COBWEB/3 tree
//! - [`cluster`]: split iteration and clustering views
//! - [`selection`]: information criteria and split-count search
//! - [`stats`]: small statistical helpers and random tie-breaking
//!
//! ## Example
//!
//! ```rust
//! use cobweb_cuts::{instance, k_cluster, Assignment, CobwebTree, Value};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let data: Vec<_> = (0..6)
//!     .map(|i| instance([("x", Value::from((i % 2) as f64 * 100.0 + i as f64))]))
//!     .collect();
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let tree = CobwebTree::new();
//! let labels = k_cluster(&tree, &data, 2, Assignment::Fit, &mut rng)?;
//! assert_eq!(labels.len(), 6);
//! # Ok::<(), cobweb_cuts::Error>(())
//! ```

pub mod cluster;
/// Error types used across `cobweb-cuts`.
pub mod error;
pub mod selection;
pub mod stats;
pub mod tree;


pub use error::{Error, Result};

pub use cluster::{
    cluster, depth_labels, k_cluster, Assignment, Clustering, Label, LabelKind, SplitConfig,
    SplitIter,
};
pub use selection::{aic, aicc, bic, cluster_split_search, Criterion};
pub use tree::{instance, CobwebConfig, CobwebTree, ConceptTree, Instance, NodeId, Value};
