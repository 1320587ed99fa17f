//! Flat clusterings cut from a concept hierarchy.
//!
//! A concept tree holds many partitions at once. This module reads them off
//! the top level by repeatedly splitting the least cohesive top-level cluster.
//!
//! ## How a Split Is Chosen
//!
//! For every top-level cluster `c` that has children, compute
//!
//! ```text
//! Δ(c) = CU(root with c replaced by c's children) - CU(root)
//! ```
//!
//! and split the cluster with the largest `Δ`. Category utility rewards
//! partitions whose members make attribute values more predictable, so a
//! large `Δ` means `c` was hiding useful structure.
//!
//! ## Views
//!
//! | View             | Use when                                         |
//! |------------------|--------------------------------------------------|
//! | [`SplitIter`]    | you want to inspect clusterings one at a time    |
//! | [`cluster`]      | you want all clusterings in a split range        |
//! | [`k_cluster`]    | you know the cluster budget `k`                  |
//! | [`depth_labels`] | you want the whole hierarchy as label rows       |
//!
//! To pick the split count automatically with an information criterion, see
//! [`crate::selection`].
//!
//! ## Determinism
//!
//! Tree insertion and categorization break ties at random, so every function
//! takes the random source explicitly. With a seeded `StdRng` results are
//! reproducible.

mod split;
mod views;

pub use split::{
    assign, Assignment, Clustering, Label, LabelKind, SplitConfig, SplitIter, CONCEPT_TAG,
    DEFAULT_MAXSPLIT,
};
pub use views::{cluster, depth_labels, distinct_labels, k_cluster};
