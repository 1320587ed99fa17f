//! Choosing a split count with information criteria.
//!
//! Every clustering produced by [`SplitIter`] is a mixture model: one
//! concept per cluster, each with its own attribute distributions. Scoring
//! those models trades fit against size:
//!
//! ```text
//! AIC  = 2k − 2·ln L
//! AICc = AIC + 2k(k+1) / (n − k − 1)
//! BIC  = k·ln(n) − 2·ln L
//! ```
//!
//! where `ln L` sums each cluster's log-likelihood of its own instances,
//! `n` is the number of instances and `k` counts free parameters:
//!
//! | Attribute kind | Parameters per cluster |
//! |----------------|------------------------|
//! | continuous     | 3                      |
//! | nominal        | distinct values + 1    |
//!
//! Attributes whose name starts with `_` are hidden and never counted. The
//! per-cluster cost is taken from the root, so every cluster pays for every
//! value seen anywhere in the data.
//!
//! AICc is computed as written: when `n − k − 1` is zero the score is
//! infinite, and when it is negative the correction is negative.
//!
//! [`cluster_split_search`] walks the split range and keeps the clustering
//! that minimizes a heuristic (any of the above, or a caller-supplied one).

use std::collections::BTreeSet;

use rand::Rng;

use crate::cluster::{assign, cluster, Assignment, Clustering, LabelKind, SplitConfig, SplitIter};
use crate::error::{Error, Result};
use crate::stats::is_hidden;
use crate::tree::{ConceptTree, Instance, NodeId};

/// Free parameters of a model with one concept per cluster.
pub fn parameter_count<T: ConceptTree>(clusters: &BTreeSet<NodeId>, tree: &T) -> usize {
    let per_cluster: usize = tree
        .av_counts(tree.root())
        .iter()
        .filter(|(attr, _)| !is_hidden(attr))
        .map(|(_, values)| values.parameter_count())
        .sum();
    per_cluster * clusters.len()
}

/// Sum of the clusters' log-likelihoods.
pub fn total_log_likelihood<T: ConceptTree>(clusters: &BTreeSet<NodeId>, tree: &T) -> f64 {
    clusters.iter().map(|&c| tree.log_likelihood(c)).sum()
}

/// Akaike information criterion.
pub fn aic<T: ConceptTree>(clusters: &BTreeSet<NodeId>, tree: &T, _instances: &[Instance]) -> f64 {
    let k = parameter_count(clusters, tree) as f64;
    2.0 * k - 2.0 * total_log_likelihood(clusters, tree)
}

/// AIC with the small-sample correction.
pub fn aicc<T: ConceptTree>(clusters: &BTreeSet<NodeId>, tree: &T, instances: &[Instance]) -> f64 {
    let k = parameter_count(clusters, tree) as f64;
    let n = instances.len() as f64;
    aic(clusters, tree, instances) + 2.0 * k * (k + 1.0) / (n - k - 1.0)
}

/// Bayesian information criterion.
pub fn bic<T: ConceptTree>(clusters: &BTreeSet<NodeId>, tree: &T, instances: &[Instance]) -> f64 {
    let k = parameter_count(clusters, tree) as f64;
    let n = instances.len() as f64;
    k * n.ln() - 2.0 * total_log_likelihood(clusters, tree)
}

/// Built-in model selection criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Criterion {
    /// [`aic`].
    Aic,
    /// [`aicc`].
    Aicc,
    /// [`bic`].
    #[default]
    Bic,
}

impl Criterion {
    /// Score a clustering; lower is better.
    pub fn score<T: ConceptTree>(
        &self,
        clusters: &BTreeSet<NodeId>,
        tree: &T,
        instances: &[Instance],
    ) -> f64 {
        match self {
            Criterion::Aic => aic(clusters, tree, instances),
            Criterion::Aicc => aicc(clusters, tree, instances),
            Criterion::Bic => bic(clusters, tree, instances),
        }
    }
}

/// The clustering in `[minsplit, maxsplit]` that minimizes `heuristic`.
///
/// The heuristic sees each candidate as a set of nodes in the working tree
/// it is handed, along with all instances. Ties go to the smallest split
/// count. The winner is then relabeled with concept labels by categorizing
/// the instances into the assigned tree and splitting it the winning number
/// of times.
///
/// Note that the relabeling pass reuses the statistics accumulated while
/// assigning for the search; it does not start again from `tree`. With
/// [`Assignment::Fit`] the labels therefore come from a tree that has seen
/// every instance once already.
///
/// `tree` is never modified.
///
/// # Errors
///
/// - [`Error::InvalidParameter`] for invalid split bounds
/// - [`Error::EmptyInput`] if `instances` is empty
/// - [`Error::NoClustering`] if no candidate scored below infinity
pub fn cluster_split_search<T, H, R>(
    tree: &T,
    instances: &[Instance],
    heuristic: H,
    minsplit: usize,
    maxsplit: usize,
    assignment: Assignment,
    rng: &mut R,
) -> Result<Clustering>
where
    T: ConceptTree,
    H: Fn(&BTreeSet<NodeId>, &T, &[Instance]) -> f64,
    R: Rng + ?Sized,
{
    let config = SplitConfig::new()
        .with_splits(minsplit, maxsplit)
        .with_assignment(assignment)
        .with_labels(LabelKind::Node);
    config.validate()?;
    if instances.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut working = tree.clone();
    let leaves = assign(&mut working, instances, assignment, rng);
    let assigned = working.clone();
    let mut splits = SplitIter::from_assignments(working, leaves, config)?;

    let mut best_split = None;
    let mut best_score = f64::INFINITY;
    let mut split = minsplit;
    while let Some(clustering) = splits.next() {
        let clusters: BTreeSet<NodeId> = clustering.iter().filter_map(|l| l.node()).collect();
        let score = heuristic(&clusters, splits.tree(), instances);
        log::debug!("split {split}: {} clusters, score {score:.4}", clusters.len());

        if score < best_score {
            best_score = score;
            best_split = Some(split);
        }
        split += 1;
    }

    let Some(best) = best_split else {
        return Err(Error::NoClustering { minsplit });
    };
    log::debug!("best split count {best} with score {best_score:.4}");

    cluster(&assigned, instances, best, best, Assignment::Categorize, rng)?
        .into_iter()
        .next()
        .ok_or(Error::NoClustering { minsplit })
}
