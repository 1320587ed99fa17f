//! Successive splitting of a concept tree's top level.
//!
//! Starting from the root's children as the coarsest clustering, each step
//! splits the top-level cluster whose split gains the most category utility,
//! replacing it with its own children:
//!
//! ```text
//! split 1:  {A} {B}           A and B are the root's children
//! split 2:  {A1} {A2} {B}     splitting A gains the most utility
//! split 3:  {A1} {A2} {B1} {B2}
//! ```
//!
//! The iteration runs on a private clone of the tree, so the caller's tree is
//! never modified. It ends after `maxsplit` clusterings or as soon as every
//! top-level cluster is a leaf.

use std::fmt;

use rand::Rng;

use crate::error::{Error, Result};
use crate::tree::{ConceptTree, Instance, NodeId};

/// Prefix of every concept label.
pub const CONCEPT_TAG: &str = "Concept";

/// Default upper bound on the number of splits.
pub const DEFAULT_MAXSPLIT: usize = 100_000;

/// How instances are placed in the tree before splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assignment {
    /// Incorporate each instance, updating the tree's statistics.
    #[default]
    Fit,
    /// Sort each instance to a leaf without changing statistics.
    Categorize,
}

/// What a clustering is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelKind {
    /// Concept identifier strings, e.g. `Concept17`.
    #[default]
    Concept,
    /// Raw node handles into the tree that produced the clustering.
    Node,
}

/// Cluster label of a single instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// Tagged concept identifier.
    Concept(String),
    /// Node handle.
    Node(NodeId),
}

impl Label {
    /// Concept label of `node`.
    pub fn concept<T: ConceptTree>(tree: &T, node: NodeId) -> Self {
        Label::Concept(format!("{CONCEPT_TAG}{}", tree.concept_id(node)))
    }

    /// The node handle, if this is a node label.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Label::Node(id) => Some(*id),
            Label::Concept(_) => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Concept(s) => write!(f, "{s}"),
            Label::Node(id) => write!(f, "{id}"),
        }
    }
}

/// One label per instance, in instance order.
pub type Clustering = Vec<Label>;

/// Configuration for a [`SplitIter`].
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// First split count that produces a clustering (>= 1).
    pub minsplit: usize,
    /// Last split count that produces a clustering (>= `minsplit`).
    pub maxsplit: usize,
    /// Fit or categorize the instances.
    pub assignment: Assignment,
    /// Label representation.
    pub labels: LabelKind,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            minsplit: 1,
            maxsplit: DEFAULT_MAXSPLIT,
            assignment: Assignment::Fit,
            labels: LabelKind::Concept,
        }
    }
}

impl SplitConfig {
    /// Create a new split configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum split count.
    pub fn with_minsplit(mut self, minsplit: usize) -> Self {
        self.minsplit = minsplit;
        self
    }

    /// Set the maximum split count.
    pub fn with_maxsplit(mut self, maxsplit: usize) -> Self {
        self.maxsplit = maxsplit;
        self
    }

    /// Set both split bounds.
    pub fn with_splits(self, minsplit: usize, maxsplit: usize) -> Self {
        self.with_minsplit(minsplit).with_maxsplit(maxsplit)
    }

    /// Set how instances are assigned.
    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignment = assignment;
        self
    }

    /// Set the label representation.
    pub fn with_labels(mut self, labels: LabelKind) -> Self {
        self.labels = labels;
        self
    }

    /// Reject split bounds that cannot produce a clustering.
    pub fn validate(&self) -> Result<()> {
        if self.minsplit < 1 {
            return Err(Error::InvalidParameter {
                name: "minsplit",
                message: "must be >= 1",
            });
        }
        if self.maxsplit < self.minsplit {
            return Err(Error::InvalidParameter {
                name: "maxsplit",
                message: "must be >= minsplit",
            });
        }
        Ok(())
    }
}

/// Place every instance in `tree`, returning the leaf of each.
pub fn assign<T, R>(tree: &mut T, instances: &[Instance], assignment: Assignment, rng: &mut R) -> Vec<NodeId>
where
    T: ConceptTree,
    R: Rng + ?Sized,
{
    match assignment {
        Assignment::Fit => instances.iter().map(|inst| tree.ifit(inst, rng)).collect(),
        Assignment::Categorize => instances.iter().map(|inst| tree.categorize(inst, rng)).collect(),
    }
}

/// Lazy sequence of clusterings of increasing resolution.
///
/// Each clustering labels every instance with the top-level cluster (a child
/// of the root) containing its leaf. Between clusterings the least cohesive
/// internal top-level cluster is split. The distinct-label count never
/// decreases along the sequence.
#[derive(Debug, Clone)]
pub struct SplitIter<T: ConceptTree> {
    tree: T,
    leaves: Vec<NodeId>,
    config: SplitConfig,
    nth_split: usize,
    split_pending: bool,
    exhausted: bool,
}

impl<T: ConceptTree> SplitIter<T> {
    /// Clone `tree`, assign `instances` to it and prepare to split.
    ///
    /// Fails before touching anything if the split bounds are invalid or
    /// `instances` is empty.
    pub fn new<R: Rng + ?Sized>(
        tree: &T,
        instances: &[Instance],
        config: SplitConfig,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        if instances.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut working = tree.clone();
        let leaves = assign(&mut working, instances, config.assignment, rng);
        Self::from_assignments(working, leaves, config)
    }

    /// Split an already-assigned tree; `leaves[i]` is the leaf of instance `i`.
    ///
    /// The tree is owned and will be modified; `config.assignment` is ignored.
    /// Every leaf must be a live node of `tree`.
    pub fn from_assignments(tree: T, leaves: Vec<NodeId>, config: SplitConfig) -> Result<Self> {
        config.validate()?;
        if leaves.is_empty() {
            return Err(Error::EmptyInput);
        }
        if let Some(stray) = leaves.iter().find(|&&leaf| !tree.contains(leaf)) {
            log::debug!("leaf {stray} is not part of the tree");
            return Err(Error::InvalidParameter {
                name: "leaves",
                message: "every leaf must belong to the tree",
            });
        }

        Ok(Self {
            tree,
            leaves,
            config,
            nth_split: 1,
            split_pending: false,
            exhausted: false,
        })
    }

    /// The working tree, as of the last clustering produced.
    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Consume the iterator, returning the working tree.
    pub fn into_tree(self) -> T {
        self.tree
    }

    /// Leaf of each instance.
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// Top-level cluster containing `leaf`.
    fn top_level(&self, leaf: NodeId) -> NodeId {
        let mut current = leaf;
        while let Some(parent) = self.tree.parent(current) {
            if self.tree.parent(parent).is_none() {
                break;
            }
            current = parent;
        }
        current
    }

    fn current(&self) -> Clustering {
        self.leaves
            .iter()
            .map(|&leaf| {
                let top = self.top_level(leaf);
                match self.config.labels {
                    LabelKind::Concept => Label::concept(&self.tree, top),
                    LabelKind::Node => Label::Node(top),
                }
            })
            .collect()
    }

    /// Split the top-level cluster with the largest utility gain.
    ///
    /// Ties go to the candidate that comes last among the root's children.
    /// Returns `false` when every top-level cluster is a leaf.
    fn split_least_cohesive(&mut self) -> bool {
        let root = self.tree.root();
        let base = self.tree.category_utility(root);

        let mut candidates: Vec<(f64, usize, NodeId)> = self
            .tree
            .children(root)
            .iter()
            .enumerate()
            .filter(|(_, &c)| !self.tree.children(c).is_empty())
            .map(|(i, &c)| (self.tree.cu_for_split(root, c) - base, i, c))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let Some(&(delta, index, node)) = candidates.last() else {
            return false;
        };

        log::trace!(
            "split {}: splitting child {} ({}) with utility delta {:.6}",
            self.nth_split,
            index,
            node,
            delta
        );
        self.tree.split(root, node);
        true
    }
}

impl<T: ConceptTree> Iterator for SplitIter<T> {
    type Item = Clustering;

    fn next(&mut self) -> Option<Clustering> {
        loop {
            if self.split_pending {
                self.split_pending = false;
                if !self.split_least_cohesive() {
                    self.exhausted = true;
                }
                self.nth_split += 1;
            }

            if self.exhausted || self.nth_split > self.config.maxsplit {
                return None;
            }

            self.split_pending = true;
            if self.nth_split >= self.config.minsplit {
                return Some(self.current());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::{instance, CobwebTree, Value};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn data() -> Vec<Instance> {
        let mut out = Vec::new();
        for i in 0..8 {
            let x = (i % 4) as f64 * 20.0 + i as f64 * 0.3;
            let color = if i % 2 == 0 { "red" } else { "blue" };
            out.push(instance([("x", Value::from(x)), ("color", Value::from(color))]));
        }
        out
    }

    fn distinct(c: &Clustering) -> usize {
        c.iter().collect::<HashSet<_>>().len()
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let tree = CobwebTree::new();
        let err = SplitIter::new(&tree, &data(), SplitConfig::new().with_minsplit(0), &mut rng);
        assert!(matches!(err, Err(Error::InvalidParameter { name: "minsplit", .. })));

        let err = SplitIter::new(&tree, &data(), SplitConfig::new().with_splits(3, 2), &mut rng);
        assert!(matches!(err, Err(Error::InvalidParameter { name: "maxsplit", .. })));

        let err = SplitIter::new(&tree, &[], SplitConfig::new(), &mut rng);
        assert!(matches!(err, Err(Error::EmptyInput)));
    }

    #[test]
    fn test_foreign_leaves_rejected() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut tree = CobwebTree::new();
        let leaves = tree.fit(&data(), &mut rng);

        let stray = NodeId(tree.arena_len() + 10);
        let err = SplitIter::from_assignments(tree.clone(), vec![leaves[0], stray], SplitConfig::new());
        assert!(matches!(err, Err(Error::InvalidParameter { name: "leaves", .. })));

        let splits = SplitIter::from_assignments(tree, leaves, SplitConfig::new()).unwrap();
        assert!(splits.count() >= 1);
    }

    #[test]
    fn test_caller_tree_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let tree = CobwebTree::new();
        let all: Vec<Clustering> = SplitIter::new(&tree, &data(), SplitConfig::new(), &mut rng)
            .unwrap()
            .collect();
        assert!(!all.is_empty());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_labels_are_tagged_concepts() {
        let mut rng = StdRng::seed_from_u64(2);
        let tree = CobwebTree::new();
        let first = SplitIter::new(&tree, &data(), SplitConfig::new(), &mut rng)
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(first.len(), 8);
        for label in &first {
            assert!(label.to_string().starts_with(CONCEPT_TAG));
        }
    }

    #[test]
    fn test_node_labels_are_root_children() {
        let mut rng = StdRng::seed_from_u64(3);
        let tree = CobwebTree::new();
        let mut splits = SplitIter::new(
            &tree,
            &data(),
            SplitConfig::new().with_labels(LabelKind::Node),
            &mut rng,
        )
        .unwrap();

        let first = splits.next().unwrap();
        let root = splits.tree().root();
        for label in first {
            let node = label.node().unwrap();
            assert_eq!(splits.tree().parent(node), Some(root));
        }
    }

    #[test]
    fn test_resolution_never_decreases() {
        let mut rng = StdRng::seed_from_u64(4);
        let tree = CobwebTree::new();
        let counts: Vec<usize> = SplitIter::new(&tree, &data(), SplitConfig::new(), &mut rng)
            .unwrap()
            .map(|c| distinct(&c))
            .collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{counts:?}");
    }

    #[test]
    fn test_terminates_when_all_top_level_are_leaves() {
        let mut rng = StdRng::seed_from_u64(5);
        let tree = CobwebTree::new();
        let mut splits = SplitIter::new(&tree, &data(), SplitConfig::new(), &mut rng).unwrap();
        let mut produced = 0;
        while splits.next().is_some() {
            produced += 1;
        }
        assert!(produced < DEFAULT_MAXSPLIT);

        let t = splits.tree();
        assert!(t.children(t.root()).iter().all(|&c| t.children(c).is_empty()));
    }

    #[test]
    fn test_minsplit_skips_early_clusterings() {
        let tree = CobwebTree::new();
        let all: Vec<Clustering> = SplitIter::new(
            &tree,
            &data(),
            SplitConfig::new(),
            &mut StdRng::seed_from_u64(6),
        )
        .unwrap()
        .collect();

        let later: Vec<Clustering> = SplitIter::new(
            &tree,
            &data(),
            SplitConfig::new().with_minsplit(2),
            &mut StdRng::seed_from_u64(6),
        )
        .unwrap()
        .collect();

        assert_eq!(later.len(), all.len() - 1);
        assert_eq!(later[..], all[1..]);
    }

    #[test]
    fn test_single_instance_yields_root() {
        let mut rng = StdRng::seed_from_u64(7);
        let tree = CobwebTree::new();
        let only = vec![instance([("x", Value::from(1.0))])];
        let all: Vec<Clustering> = SplitIter::new(&tree, &only, SplitConfig::new(), &mut rng)
            .unwrap()
            .collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], vec![Label::Concept("Concept0".into())]);
    }
}
