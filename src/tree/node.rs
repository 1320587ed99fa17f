//! Concept node stored in a tree arena.

use core::fmt;

use super::traits::NodeId;
use super::values::Summary;

/// A node in a concept hierarchy.
///
/// Nodes reference each other by [`NodeId`]; the parent link is a plain
/// back-reference and ownership flows from the arena.
#[derive(Debug, Clone)]
pub struct ConceptNode {
    /// Stable identifier.
    pub concept_id: u64,
    /// Statistics of the instances below this node.
    pub summary: Summary,
    /// Parent, `None` at the root.
    pub parent: Option<NodeId>,
    /// Child node IDs (empty for leaves).
    pub children: Vec<NodeId>,
    /// Set once the node has been split away; retired nodes are unreachable.
    pub retired: bool,
}

impl ConceptNode {
    /// Create a new node.
    pub fn new(concept_id: u64, summary: Summary, parent: Option<NodeId>) -> Self {
        Self {
            concept_id,
            summary,
            parent,
            children: Vec::new(),
            retired: false,
        }
    }

    /// Check if this is a leaf node.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of instances below this node.
    pub fn count(&self) -> f64 {
        self.summary.count()
    }
}

impl fmt::Display for ConceptNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_leaf() { "Leaf" } else { "Node" };
        write!(f, "{kind}[Concept{}] n={}", self.concept_id, self.count())
    }
}
