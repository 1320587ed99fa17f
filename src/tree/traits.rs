//! Concept tree traits.

use std::fmt;

use rand::Rng;

use super::record::Instance;
use super::values::AvCounts;

/// Handle to a node inside a concept tree's arena.
///
/// Handles stay valid across `Clone`: a cloned tree answers for the same
/// handles with its own, independent copy of each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A probabilistic concept hierarchy.
///
/// This is everything the split search needs from a tree: navigation,
/// instance assignment, category utility, splitting and likelihood.
/// `Clone` must produce a fully independent copy (statistics included).
pub trait ConceptTree: Clone {
    /// The root concept.
    fn root(&self) -> NodeId;

    /// Is `node` a live node of this tree?
    fn contains(&self, node: NodeId) -> bool;

    /// Parent of `node`; `None` only at the root.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Ordered children of `node`.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// Stable identifier of `node`.
    fn concept_id(&self, node: NodeId) -> String;

    /// Attribute statistics of `node`.
    fn av_counts(&self, node: NodeId) -> &AvCounts;

    /// Incorporate `instance` into the tree and return the leaf it ends up in.
    fn ifit<R: Rng + ?Sized>(&mut self, instance: &Instance, rng: &mut R) -> NodeId;

    /// Return the leaf `instance` would be sorted into, without changing statistics.
    fn categorize<R: Rng + ?Sized>(&self, instance: &Instance, rng: &mut R) -> NodeId;

    /// Category utility of `node`'s current partition into its children.
    fn category_utility(&self, node: NodeId) -> f64;

    /// Category utility of `node` if `child` were replaced by its own children.
    fn cu_for_split(&self, node: NodeId, child: NodeId) -> f64;

    /// Replace `child` with its children, which become children of `node`.
    fn split(&mut self, node: NodeId, child: NodeId);

    /// Log-likelihood of the instances summarized by `node`.
    fn log_likelihood(&self, node: NodeId) -> f64;
}
