//! Arena-backed COBWEB/3 concept tree.
//!
//! COBWEB (Fisher, 1987) builds a concept hierarchy one instance at a time.
//! At every node on the way down, the instance is either added to the best
//! child, placed in a new child, used to merge the two best children, or the
//! best child is split into its own children, whichever maximizes
//! category utility. COBWEB/3 (McKusick & Thompson, 1990) extends nominal
//! counts with Gaussian summaries for numeric attributes.
//!
//! ```text
//!            root                 best   : descend into the best child
//!          /  |   \               new    : add a sibling for the instance
//!        c1   c2   c3             merge  : join the two best children
//!       / \                       split  : promote the best child's children
//!     l1   l2
//! ```
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`], so a
//! `clone()` is a plain copy of the arena and every handle stays meaningful in
//! the copy. Split-away nodes are retired in place and their slot is never
//! reused; leaves keep their identity for the lifetime of the tree.
//!
//! # References
//!
//! - Fisher (1987). "Knowledge acquisition via incremental conceptual clustering."
//! - McKusick & Thompson (1990). "COBWEB/3: A portable implementation."

use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::node::ConceptNode;
use super::record::{Instance, Value};
use super::traits::{ConceptTree, NodeId};
use super::values::{category_utility, AttrValues, AvCounts, Summary};
use crate::error::{Error, Result};
use crate::stats::{most_likely_choice, random_tiebreaker, tiebreak_top_2, weighted_choice};

/// Configuration for a [`CobwebTree`].
#[derive(Debug, Clone)]
pub struct CobwebConfig {
    /// Lower bound on the standard deviation of continuous attributes.
    pub acuity: f64,
}

impl Default for CobwebConfig {
    fn default() -> Self {
        Self { acuity: 1.0 }
    }
}

impl CobwebConfig {
    /// Create a new tree configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acuity.
    pub fn with_acuity(mut self, acuity: f64) -> Self {
        self.acuity = acuity;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Best,
    New,
    Merge(NodeId),
    Split,
}

/// A COBWEB/3 concept hierarchy.
#[derive(Debug, Clone)]
pub struct CobwebTree {
    /// Every node ever created, indexed by [`NodeId`].
    nodes: Vec<ConceptNode>,
    root: NodeId,
    config: CobwebConfig,
}

impl Default for CobwebTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CobwebTree {
    /// Create an empty tree with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CobwebConfig::default())
    }

    /// Create an empty tree.
    pub fn with_config(config: CobwebConfig) -> Self {
        Self {
            nodes: vec![ConceptNode::new(0, Summary::default(), None)],
            root: NodeId(0),
            config,
        }
    }

    /// Configuration used by this tree.
    pub fn config(&self) -> &CobwebConfig {
        &self.config
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> &ConceptNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ConceptNode {
        &mut self.nodes[id.0]
    }

    /// Iterate over the nodes still in the tree.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ConceptNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.retired)
            .map(|(i, n)| (NodeId(i), n))
    }

    /// Number of nodes still in the tree.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Check if the tree has seen no instances.
    pub fn is_empty(&self) -> bool {
        self.node(self.root).count() == 0.0
    }

    /// Size of the arena, retired nodes included.
    pub(crate) fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Fit every instance in order, returning the leaf of each.
    pub fn fit<R: Rng + ?Sized>(&mut self, instances: &[Instance], rng: &mut R) -> Vec<NodeId> {
        instances.iter().map(|inst| self.ifit(inst, rng)).collect()
    }

    /// Fill in the attributes `instance` is missing from the concept it categorizes into.
    ///
    /// Nominal attributes get their most likely value, continuous attributes their mean.
    pub fn predict<R: Rng + ?Sized>(&self, instance: &Instance, rng: &mut R) -> Result<Instance> {
        let concept = self.categorize(instance, rng);
        let mut out = instance.clone();

        for (attr, values) in self.av_counts(concept) {
            if out.contains_key(attr) {
                continue;
            }
            let value = match values {
                AttrValues::Continuous(cv) => Value::Numeric(cv.unbiased_mean()),
                AttrValues::Nominal(counts) => {
                    let choices: Vec<(&String, f64)> = counts.iter().map(|(v, c)| (v, *c)).collect();
                    Value::Nominal((*most_likely_choice(&choices, rng)?).clone())
                }
            };
            let _ = out.insert(attr.clone(), value);
        }

        Ok(out)
    }

    /// Draw a random instance from the distribution summarized by `node`.
    ///
    /// Attributes absent from some of the node's instances may be left out.
    pub fn sample<R: Rng + ?Sized>(&self, node: NodeId, rng: &mut R) -> Result<Instance> {
        let summary = &self.node(node).summary;
        let mut out = Instance::new();

        for (attr, values) in summary.av_counts() {
            match values {
                AttrValues::Nominal(counts) => {
                    let seen: f64 = counts.values().sum();
                    let mut choices: Vec<(Option<&String>, f64)> =
                        counts.iter().map(|(v, c)| (Some(v), *c)).collect();
                    choices.push((None, (summary.count() - seen).max(0.0)));

                    if let Some(v) = *weighted_choice(&choices, rng)? {
                        let _ = out.insert(attr.clone(), Value::Nominal(v.clone()));
                    }
                }
                AttrValues::Continuous(cv) => {
                    let present = [(true, cv.num()), (false, (summary.count() - cv.num()).max(0.0))];
                    if *weighted_choice(&present, rng)? {
                        let normal = Normal::new(cv.unbiased_mean(), cv.unbiased_std())
                            .map_err(|e| Error::Other(e.to_string()))?;
                        let _ = out.insert(attr.clone(), Value::Numeric(normal.sample(rng)));
                    }
                }
            }
        }

        Ok(out)
    }

    fn alloc(&mut self, summary: Summary, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ConceptNode::new(id.0 as u64, summary, parent));
        id
    }

    fn utility(&self, parent: &Summary, children: &[&Summary]) -> f64 {
        category_utility(parent, children, self.config.acuity)
    }

    fn cu_for_insert(&self, node: NodeId, child: NodeId, instance: &Instance) -> f64 {
        let mut parent = self.node(node).summary.clone();
        parent.increment(instance);
        let mut updated = self.node(child).summary.clone();
        updated.increment(instance);

        let children: Vec<&Summary> = self
            .node(node)
            .children
            .iter()
            .map(|&c| if c == child { &updated } else { &self.node(c).summary })
            .collect();
        self.utility(&parent, &children)
    }

    fn cu_for_new_child(&self, node: NodeId, instance: &Instance) -> f64 {
        let mut parent = self.node(node).summary.clone();
        parent.increment(instance);
        let fresh = Summary::of(instance);

        let mut children: Vec<&Summary> =
            self.node(node).children.iter().map(|&c| &self.node(c).summary).collect();
        children.push(&fresh);
        self.utility(&parent, &children)
    }

    fn cu_for_merge(&self, node: NodeId, best1: NodeId, best2: NodeId, instance: &Instance) -> f64 {
        let mut parent = self.node(node).summary.clone();
        parent.increment(instance);
        let mut merged = self.node(best1).summary.clone();
        merged.absorb(&self.node(best2).summary);
        merged.increment(instance);

        let mut children: Vec<&Summary> = self
            .node(node)
            .children
            .iter()
            .filter(|&&c| c != best1 && c != best2)
            .map(|&c| &self.node(c).summary)
            .collect();
        children.push(&merged);
        self.utility(&parent, &children)
    }

    /// Children sorted by insertion utility, best first, with the two best picked.
    fn two_best_children<R: Rng + ?Sized>(
        &self,
        node: NodeId,
        instance: &Instance,
        rng: &mut R,
    ) -> Option<(f64, NodeId, Option<NodeId>)> {
        let mut scored: Vec<(f64, f64, NodeId)> = self
            .node(node)
            .children
            .iter()
            .map(|&c| (self.cu_for_insert(node, c, instance), self.node(c).count(), c))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.total_cmp(&a.1)));

        let &(best_cu, _, best) = scored.first()?;
        match tiebreak_top_2(&scored, |s| s.0, rng) {
            Ok((b1, b2)) => Some((b1.0, b1.2, Some(b2.2))),
            Err(_) => Some((best_cu, best, None)),
        }
    }

    fn best_operation<R: Rng + ?Sized>(
        &self,
        node: NodeId,
        instance: &Instance,
        best1_cu: f64,
        best1: NodeId,
        best2: Option<NodeId>,
        rng: &mut R,
    ) -> Operation {
        let mut ops = vec![
            (best1_cu, Operation::Best),
            (self.cu_for_new_child(node, instance), Operation::New),
        ];
        // Merging the only two children would recreate the parent.
        if let Some(b2) = best2.filter(|_| self.node(node).children.len() > 2) {
            ops.push((self.cu_for_merge(node, best1, b2, instance), Operation::Merge(b2)));
        }
        if !self.node(best1).is_leaf() {
            ops.push((self.cu_for_split(node, best1), Operation::Split));
        }
        ops.sort_by(|a, b| b.0.total_cmp(&a.0));

        random_tiebreaker(&ops, |op| op.0, rng)
            .map(|op| op.1)
            .unwrap_or(Operation::Best)
    }

    fn create_new_child(&mut self, node: NodeId, instance: &Instance) -> NodeId {
        let child = self.alloc(Summary::of(instance), Some(node));
        self.node_mut(node).children.push(child);
        child
    }

    /// Insert a copy of `leaf` above it, so the leaf keeps its identity.
    fn insert_parent_above(&mut self, leaf: NodeId) -> NodeId {
        let old_parent = self.node(leaf).parent;
        let summary = self.node(leaf).summary.clone();
        let parent = self.alloc(summary, old_parent);
        self.node_mut(parent).children.push(leaf);
        self.node_mut(leaf).parent = Some(parent);

        match old_parent {
            Some(p) => {
                let siblings = &mut self.node_mut(p).children;
                siblings.retain(|&c| c != leaf);
                siblings.push(parent);
            }
            None => self.root = parent,
        }
        parent
    }

    fn merge(&mut self, node: NodeId, best1: NodeId, best2: NodeId) -> NodeId {
        let mut summary = self.node(best1).summary.clone();
        summary.absorb(&self.node(best2).summary);
        let merged = self.alloc(summary, Some(node));

        self.node_mut(best1).parent = Some(merged);
        self.node_mut(best2).parent = Some(merged);
        self.node_mut(merged).children = vec![best1, best2];

        let children = &mut self.node_mut(node).children;
        children.retain(|&c| c != best1 && c != best2);
        children.push(merged);
        merged
    }

    fn cobweb<R: Rng + ?Sized>(&mut self, instance: &Instance, rng: &mut R) -> NodeId {
        let mut current = self.root;
        loop {
            let node = self.node(current);
            if node.is_leaf() {
                if node.count() == 0.0 || node.summary.is_exact_match(instance) {
                    self.node_mut(current).summary.increment(instance);
                    return current;
                }
                let parent = self.insert_parent_above(current);
                self.node_mut(parent).summary.increment(instance);
                return self.create_new_child(parent, instance);
            }

            let Some((best1_cu, best1, best2)) = self.two_best_children(current, instance, rng) else {
                self.node_mut(current).summary.increment(instance);
                return self.create_new_child(current, instance);
            };

            match self.best_operation(current, instance, best1_cu, best1, best2, rng) {
                Operation::Best => {
                    self.node_mut(current).summary.increment(instance);
                    current = best1;
                }
                Operation::New => {
                    self.node_mut(current).summary.increment(instance);
                    return self.create_new_child(current, instance);
                }
                Operation::Merge(best2) => {
                    self.node_mut(current).summary.increment(instance);
                    current = self.merge(current, best1, best2);
                }
                Operation::Split => self.split(current, best1),
            }
        }
    }
}

impl ConceptTree for CobwebTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.get(node.0).is_some_and(|n| !n.retired)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    fn concept_id(&self, node: NodeId) -> String {
        self.node(node).concept_id.to_string()
    }

    fn av_counts(&self, node: NodeId) -> &AvCounts {
        self.node(node).summary.av_counts()
    }

    fn ifit<R: Rng + ?Sized>(&mut self, instance: &Instance, rng: &mut R) -> NodeId {
        self.cobweb(instance, rng)
    }

    fn categorize<R: Rng + ?Sized>(&self, instance: &Instance, rng: &mut R) -> NodeId {
        let mut current = self.root;
        while let Some((_, best1, _)) = self.two_best_children(current, instance, rng) {
            current = best1;
        }
        current
    }

    fn category_utility(&self, node: NodeId) -> f64 {
        let children: Vec<&Summary> =
            self.node(node).children.iter().map(|&c| &self.node(c).summary).collect();
        self.utility(&self.node(node).summary, &children)
    }

    fn cu_for_split(&self, node: NodeId, child: NodeId) -> f64 {
        let mut children: Vec<&Summary> = self
            .node(node)
            .children
            .iter()
            .filter(|&&c| c != child)
            .map(|&c| &self.node(c).summary)
            .collect();
        children.extend(self.node(child).children.iter().map(|&c| &self.node(c).summary));
        self.utility(&self.node(node).summary, &children)
    }

    fn split(&mut self, node: NodeId, child: NodeId) {
        if !self.node(node).children.contains(&child) {
            log::warn!("refusing to split {child}: not a child of {node}");
            return;
        }

        let grandchildren = std::mem::take(&mut self.node_mut(child).children);
        for &gc in &grandchildren {
            self.node_mut(gc).parent = Some(node);
        }

        let children = &mut self.node_mut(node).children;
        children.retain(|&c| c != child);
        children.extend(grandchildren);
        self.node_mut(child).retired = true;
    }

    fn log_likelihood(&self, node: NodeId) -> f64 {
        self.node(node).summary.log_likelihood(self.config.acuity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::record::instance;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn point(x: f64, y: f64) -> Instance {
        instance([("x", Value::from(x)), ("y", Value::from(y))])
    }

    fn two_blobs() -> Vec<Instance> {
        let mut out = Vec::new();
        for i in 0..6 {
            let d = i as f64 * 0.1;
            out.push(point(d, d));
            out.push(point(50.0 + d, 50.0 - d));
        }
        out
    }

    #[test]
    fn test_empty_tree() {
        let tree = CobwebTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn test_first_instance_lands_in_root() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut tree = CobwebTree::new();
        let leaf = tree.ifit(&point(1.0, 2.0), &mut rng);
        assert_eq!(leaf, tree.root());
        assert_eq!(tree.node(leaf).count(), 1.0);
    }

    #[test]
    fn test_identical_instances_share_a_leaf() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut tree = CobwebTree::new();
        let a = tree.ifit(&point(1.0, 2.0), &mut rng);
        let b = tree.ifit(&point(1.0, 2.0), &mut rng);
        assert_eq!(a, b);
        assert_eq!(tree.node(a).count(), 2.0);
    }

    #[test]
    fn test_fringe_split_keeps_leaf_identity() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut tree = CobwebTree::new();
        let first = tree.ifit(&point(0.0, 0.0), &mut rng);
        let second = tree.ifit(&point(10.0, 10.0), &mut rng);

        assert_ne!(first, second);
        let root = tree.root();
        assert_eq!(tree.children(root), &[first, second]);
        assert_eq!(tree.parent(first), Some(root));
        assert_eq!(tree.node(root).count(), 2.0);
    }

    #[test]
    fn test_merge_not_offered_between_only_two_children() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut tree = CobwebTree::new();
        let _ = tree.ifit(&point(0.0, 0.0), &mut rng);
        let _ = tree.ifit(&point(10.0, 10.0), &mut rng);
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 2);

        let third = point(5.0, 5.0);
        for _ in 0..20 {
            let (cu, best1, best2) = tree.two_best_children(root, &third, &mut rng).unwrap();
            assert!(best2.is_some());
            let op = tree.best_operation(root, &third, cu, best1, best2, &mut rng);
            assert!(!matches!(op, Operation::Merge(_)), "{op:?}");
        }
    }

    #[test]
    fn test_fit_allocates_boundedly() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut tree = CobwebTree::new();
        let data = two_blobs();
        for (i, inst) in data.iter().enumerate() {
            let _ = tree.ifit(inst, &mut rng);
            // Each insertion adds at most a fringe pair plus one merge per level.
            assert!(tree.arena_len() <= 1 + (i + 1) * (2 + data.len()), "arena {}", tree.arena_len());
        }
        assert_eq!(tree.node(tree.root()).count(), data.len() as f64);
    }

    #[test]
    fn test_counts_are_consistent() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut tree = CobwebTree::new();
        let data = two_blobs();
        let _ = tree.fit(&data, &mut rng);

        assert_eq!(tree.node(tree.root()).count(), data.len() as f64);
        for (_, node) in tree.iter() {
            if !node.is_leaf() {
                let total: f64 = node.children.iter().map(|&c| tree.node(c).count()).sum();
                assert_eq!(total, node.count());
            }
        }
    }

    #[test]
    fn test_categorize_does_not_modify() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut tree = CobwebTree::new();
        let _ = tree.fit(&two_blobs(), &mut rng);
        let before = tree.node(tree.root()).summary.clone();

        let leaf = tree.categorize(&point(0.05, 0.05), &mut rng);
        assert!(tree.node(leaf).is_leaf());
        assert_eq!(tree.node(tree.root()).summary, before);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut tree = CobwebTree::new();
        let _ = tree.fit(&two_blobs(), &mut rng);

        let mut copy = tree.clone();
        let _ = copy.ifit(&point(25.0, 25.0), &mut rng);

        assert_eq!(tree.node(tree.root()).count(), 12.0);
        assert_eq!(copy.node(copy.root()).count(), 13.0);
    }

    #[test]
    fn test_split_promotes_grandchildren() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut tree = CobwebTree::new();
        let _ = tree.fit(&two_blobs(), &mut rng);

        let root = tree.root();
        let internal = tree
            .children(root)
            .iter()
            .copied()
            .find(|&c| !tree.children(c).is_empty())
            .unwrap();
        let grandchildren = tree.children(internal).to_vec();
        let before = tree.children(root).len();

        tree.split(root, internal);

        assert!(!tree.children(root).contains(&internal));
        assert_eq!(tree.children(root).len(), before - 1 + grandchildren.len());
        for gc in grandchildren {
            assert_eq!(tree.parent(gc), Some(root));
        }
        assert!(tree.node(internal).retired);
    }

    #[test]
    fn test_separated_blobs_end_up_apart() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut tree = CobwebTree::new();
        let data = two_blobs();
        let leaves = tree.fit(&data, &mut rng);

        let top = |leaf: NodeId| {
            let mut c = leaf;
            while let Some(p) = tree.parent(c) {
                if tree.parent(p).is_none() {
                    break;
                }
                c = p;
            }
            c
        };
        // Even positions are near the origin, odd ones near (50, 50).
        assert_ne!(top(leaves[0]), top(leaves[1]));
        assert_eq!(top(leaves[0]), top(leaves[2]));
        assert_eq!(top(leaves[1]), top(leaves[3]));
    }

    #[test]
    fn test_predict_fills_missing_nominal() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut tree = CobwebTree::new();
        for _ in 0..3 {
            let _ = tree.ifit(
                &instance([("shape", Value::from("round")), ("color", Value::from("red"))]),
                &mut rng,
            );
            let _ = tree.ifit(
                &instance([("shape", Value::from("square")), ("color", Value::from("blue"))]),
                &mut rng,
            );
        }

        let guess = tree
            .predict(&instance([("shape", Value::from("round"))]), &mut rng)
            .unwrap();
        assert_eq!(guess["color"], Value::from("red"));
    }

    #[test]
    fn test_sample_draws_observed_values() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut tree = CobwebTree::new();
        let _ = tree.ifit(&instance([("color", Value::from("red"))]), &mut rng);
        let _ = tree.ifit(&instance([("color", Value::from("blue"))]), &mut rng);

        for _ in 0..20 {
            let drawn = tree.sample(tree.root(), &mut rng).unwrap();
            let color = drawn["color"].as_nominal().unwrap().to_string();
            assert!(color == "red" || color == "blue");
        }
    }
}
