//! Convenience views over [`SplitIter`].
//!
//! | Function        | Returns                                      | Tree      |
//! |-----------------|----------------------------------------------|-----------|
//! | [`cluster`]     | every clustering in a split range            | cloned    |
//! | [`k_cluster`]   | finest clustering with at most `k` clusters  | cloned    |
//! | [`depth_labels`]| one row of labels per tree depth             | modified  |

use std::collections::HashSet;

use rand::Rng;

use super::split::{assign, Assignment, Clustering, Label, SplitConfig, SplitIter};
use crate::error::{Error, Result};
use crate::tree::{ConceptTree, Instance};

/// Every clustering from `minsplit` to `maxsplit` splits, in order.
///
/// The result may be shorter than `maxsplit - minsplit + 1` if the tree runs
/// out of splittable top-level clusters.
pub fn cluster<T, R>(
    tree: &T,
    instances: &[Instance],
    minsplit: usize,
    maxsplit: usize,
    assignment: Assignment,
    rng: &mut R,
) -> Result<Vec<Clustering>>
where
    T: ConceptTree,
    R: Rng + ?Sized,
{
    let config = SplitConfig::new()
        .with_splits(minsplit, maxsplit)
        .with_assignment(assignment);
    Ok(SplitIter::new(tree, instances, config, rng)?.collect())
}

/// Number of distinct labels in a clustering.
pub fn distinct_labels(clustering: &[Label]) -> usize {
    clustering.iter().collect::<HashSet<_>>().len()
}

/// The finest clustering with at most `k` distinct clusters.
///
/// Splits until the next clustering would exceed `k`. If even the first
/// clustering is too fine, every instance is labeled with the root concept.
///
/// # Errors
///
/// [`Error::InvalidClusterCount`] if `k < 2`, checked before any work.
pub fn k_cluster<T, R>(
    tree: &T,
    instances: &[Instance],
    k: usize,
    assignment: Assignment,
    rng: &mut R,
) -> Result<Clustering>
where
    T: ConceptTree,
    R: Rng + ?Sized,
{
    if k < 2 {
        return Err(Error::InvalidClusterCount {
            requested: k,
            minimum: 2,
        });
    }

    let mut clustering = vec![Label::concept(tree, tree.root()); instances.len()];
    let config = SplitConfig::new()
        .with_maxsplit(usize::MAX)
        .with_assignment(assignment);

    for candidate in SplitIter::new(tree, instances, config, rng)? {
        let n = distinct_labels(&candidate);
        if n > k {
            log::trace!("stopping at {n} clusters (k = {k})");
            break;
        }
        clustering = candidate;
    }

    Ok(clustering)
}

/// Concept labels of every instance at every depth of the tree.
///
/// Row `d` holds each instance's ancestor at depth `d`. Instances whose leaf
/// is shallower than the deepest one repeat their leaf label. Row 0 is always
/// the root.
///
/// Unlike the other views this assigns instances to `tree` itself, so with
/// [`Assignment::Fit`] the caller's tree is updated.
pub fn depth_labels<T, R>(
    tree: &mut T,
    instances: &[Instance],
    assignment: Assignment,
    rng: &mut R,
) -> Result<Vec<Vec<Label>>>
where
    T: ConceptTree,
    R: Rng + ?Sized,
{
    if instances.is_empty() {
        return Err(Error::EmptyInput);
    }

    let leaves = assign(tree, instances, assignment, rng);
    let tree = &*tree;

    let mut chains: Vec<Vec<Label>> = leaves
        .iter()
        .map(|&leaf| {
            let mut chain = Vec::new();
            let mut current = Some(leaf);
            while let Some(node) = current {
                chain.push(Label::concept(tree, node));
                current = tree.parent(node);
            }
            chain.reverse();
            chain
        })
        .collect();

    let depth = chains.iter().map(Vec::len).max().unwrap_or(0);
    for chain in &mut chains {
        if let Some(last) = chain.last().cloned() {
            chain.resize(depth, last);
        }
    }

    Ok((0..depth)
        .map(|d| chains.iter().map(|chain| chain[d].clone()).collect())
        .collect())
}
