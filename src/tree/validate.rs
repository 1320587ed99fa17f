//! Tree validation and health checking utilities.
//!
//! Provides tools to verify concept tree integrity and detect common issues:
//! - Nodes that reach themselves through parent links
//! - Parent/child links that disagree
//! - Live nodes not reachable from the root
//! - Parents whose count differs from the sum of their children's counts
//!
//! # Example
//!
//! ```rust
//! use cobweb_cuts::tree::{CobwebTree, HealthCheck};
//!
//! let tree = CobwebTree::new();
//! let report = tree.health_check();
//! assert!(report.is_healthy(), "{}", report);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::cobweb::CobwebTree;
use super::traits::ConceptTree;

/// How serious a structural finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Unusual shape, still a valid tree.
    Warning,
    /// Statistics or links disagree.
    Error,
    /// The node graph is not a tree.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// One problem found in a concept tree.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// How serious it is.
    pub severity: Severity,
    /// What is wrong.
    pub message: String,
    /// Arena index of the offending node, if there is one.
    pub node: Option<usize>,
    /// Observed values behind the finding.
    pub context: Option<String>,
}

impl ValidationIssue {
    /// Create an issue not tied to a node.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            node: None,
            context: None,
        }
    }

    /// Attach the offending node.
    pub fn at(mut self, node: usize) -> Self {
        self.node = Some(node);
        self
    }

    /// Attach the observed values.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(node) = self.node {
            write!(f, " at #{node}")?;
        }
        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }
        Ok(())
    }
}

/// Everything a structural check found.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Findings in discovery order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Record a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Warning, message));
    }

    /// Record a critical finding.
    pub fn critical(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Critical, message));
    }

    /// Most serious finding, if any.
    pub fn worst(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }

    /// No errors or critical findings (warnings allowed).
    pub fn is_healthy(&self) -> bool {
        self.worst().map_or(true, |s| s < Severity::Error)
    }

    /// No findings at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(worst) = self.worst() else {
            return f.write_str("no issues");
        };
        writeln!(f, "{} issue(s), worst is {worst}", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

/// Structural findings plus shape statistics of a tree.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Structural findings.
    pub validation: ValidationReport,
    /// Live nodes.
    pub node_count: usize,
    /// Live leaves.
    pub leaf_count: usize,
    /// Longest root-to-node path (root = 0).
    pub max_depth: usize,
    /// Mean number of children over internal nodes.
    pub avg_branching_factor: f64,
}

impl HealthReport {
    /// See [`ValidationReport::is_healthy`].
    pub fn is_healthy(&self) -> bool {
        self.validation.is_healthy()
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} nodes ({} leaves), depth {}, branching {:.2}",
            self.node_count, self.leaf_count, self.max_depth, self.avg_branching_factor
        )?;
        write!(f, "{}", self.validation)
    }
}

/// Structural self-check.
pub trait HealthCheck {
    /// Inspect the structure and report what is wrong with it.
    fn health_check(&self) -> HealthReport;
}

impl HealthCheck for CobwebTree {
    fn health_check(&self) -> HealthReport {
        let mut parents: HashMap<usize, usize> = HashMap::new();
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut live: HashSet<usize> = HashSet::new();

        for (id, node) in self.iter() {
            let _ = live.insert(id.index());
            if let Some(p) = node.parent {
                let _ = parents.insert(id.index(), p.index());
            }
            if !node.children.is_empty() {
                let _ = children.insert(id.index(), node.children.iter().map(|c| c.index()).collect());
            }
        }

        let mut validation = validate_tree_structure(&parents, &children, &live, self.arena_len());

        if self.parent(self.root()).is_some() {
            validation.add(
                ValidationIssue::new(Severity::Critical, "root has a parent")
                    .at(self.root().index()),
            );
        }

        for (id, node) in self.iter() {
            if node.is_leaf() {
                continue;
            }
            let total: f64 = node.children.iter().map(|&c| self.node(c).count()).sum();
            if (total - node.count()).abs() > 1e-9 {
                validation.add(
                    ValidationIssue::new(Severity::Error, "count differs from sum of children")
                        .at(id.index())
                        .with_context(format!("node {}, children {}", node.count(), total)),
                );
            }
            if node.children.len() == 1 {
                validation.warn(format!("node {} has a single child", id.index()));
            }
        }

        let mut max_depth = 0;
        for (id, _) in self.iter() {
            let mut depth = 0;
            let mut cur = id;
            while let Some(p) = self.parent(cur) {
                depth += 1;
                cur = p;
                if depth > self.arena_len() {
                    break;
                }
            }
            max_depth = max_depth.max(depth);
        }

        let node_count = live.len();
        let leaf_count = self.iter().filter(|(_, n)| n.is_leaf()).count();
        let internal = node_count - leaf_count;
        let avg_branching_factor = if internal == 0 {
            0.0
        } else {
            let total_children: usize = self.iter().map(|(_, n)| n.children.len()).sum();
            total_children as f64 / internal as f64
        };

        HealthReport {
            validation,
            node_count,
            leaf_count,
            max_depth,
            avg_branching_factor,
        }
    }
}

/// Validate that a parent-child relationship forms a proper tree.
///
/// # Arguments
/// * `parents` - Map from node index to parent index (root has no entry)
/// * `children` - Map from node index to child indices
/// * `nodes` - Indices of the nodes that should be in the tree
/// * `bound` - Upper bound on any chain length (e.g. the arena size)
///
/// # Returns
/// A validation report with any issues found.
pub fn validate_tree_structure(
    parents: &HashMap<usize, usize>,
    children: &HashMap<usize, Vec<usize>>,
    nodes: &HashSet<usize>,
    bound: usize,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    let roots: Vec<usize> = nodes
        .iter()
        .copied()
        .filter(|n| !parents.contains_key(n))
        .collect();

    if roots.is_empty() {
        report.critical("no root: every node has a parent");
    } else if roots.len() > 1 {
        report.add(
            ValidationIssue::new(Severity::Error, "multiple roots").with_context(format!("{roots:?}")),
        );
    }

    // No node may reach itself by following parent links.
    for &start in nodes {
        let mut cur = start;
        let mut steps = 0;
        while let Some(&p) = parents.get(&cur) {
            if p == start {
                report.add(
                    ValidationIssue::new(Severity::Critical, "node is its own ancestor").at(start),
                );
                break;
            }
            cur = p;
            steps += 1;
            if steps > bound {
                break;
            }
        }
    }

    let mut reachable = HashSet::new();
    let mut stack = roots.clone();
    while let Some(node) = stack.pop() {
        if reachable.insert(node) {
            if let Some(node_children) = children.get(&node) {
                stack.extend(node_children);
            }
        }
    }

    let mut orphans: Vec<usize> = nodes.difference(&reachable).copied().collect();
    orphans.sort_unstable();
    if !orphans.is_empty() {
        report.add(
            ValidationIssue::new(
                Severity::Error,
                format!("{} nodes unreachable from the root", orphans.len()),
            )
            .with_context(format!("first few: {:?}", &orphans[..orphans.len().min(5)])),
        );
    }

    for (child, parent) in parents {
        match children.get(parent) {
            Some(parent_children) if parent_children.contains(child) => {}
            Some(_) => report.add(
                ValidationIssue::new(
                    Severity::Error,
                    "parent does not list this child",
                )
                .at(*child)
                .with_context(format!("parent: {}", parent)),
            ),
            None => report.add(
                ValidationIssue::new(Severity::Error, "named as a parent but has no children").at(*parent),
            ),
        }
    }

    for (parent, kids) in children {
        for kid in kids {
            if parents.get(kid) != Some(parent) {
                report.add(
                    ValidationIssue::new(Severity::Error, "child does not point back to its parent")
                        .at(*kid)
                        .with_context(format!("listed under {}", parent)),
                );
            }
        }
    }

    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used, unused_results)]
mod tests {
    use super::*;
    use crate::tree::record::{instance, Instance, Value};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn set(ids: &[usize]) -> HashSet<usize> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue::new(Severity::Error, "Something wrong")
            .at(42)
            .with_context("additional info");

        let s = format!("{}", issue);
        assert!(s.starts_with("error: "));
        assert!(s.contains("Something wrong"));
        assert!(s.contains("42"));
        assert!(s.contains("additional info"));
    }

    #[test]
    fn test_report_worst_and_display() {
        let mut report = ValidationReport::new();
        assert_eq!(report.to_string(), "no issues");
        assert_eq!(report.worst(), None);

        report.warn("node 3 has a single child");
        assert!(report.is_healthy());
        assert!(!report.is_clean());

        report.add(ValidationIssue::new(Severity::Error, "count differs from sum of children").at(3));
        assert_eq!(report.worst(), Some(Severity::Error));
        assert!(!report.is_healthy());
        assert!(report.to_string().starts_with("2 issue(s), worst is error"));
    }

    #[test]
    fn test_validate_valid_tree() {
        let parents: HashMap<usize, usize> = [(1, 0), (2, 0)].into_iter().collect();
        let children: HashMap<usize, Vec<usize>> = [(0, vec![1, 2])].into_iter().collect();

        let report = validate_tree_structure(&parents, &children, &set(&[0, 1, 2]), 3);
        assert!(report.is_healthy());
        assert!(report.is_clean());
    }

    #[test]
    fn test_validate_detects_ancestor_cycle() {
        // 0 is the root; 1 and 2 point at each other.
        let parents: HashMap<usize, usize> = [(1, 2), (2, 1)].into_iter().collect();
        let children: HashMap<usize, Vec<usize>> =
            [(1, vec![2]), (2, vec![1])].into_iter().collect();

        let report = validate_tree_structure(&parents, &children, &set(&[0, 1, 2]), 3);
        assert!(!report.is_healthy());
        assert!(report.issues.iter().any(|i| i.message.contains("own ancestor")));
        assert!(report.issues.iter().any(|i| i.message.contains("unreachable")));
    }

    #[test]
    fn test_validate_multiple_roots() {
        let parents: HashMap<usize, usize> = [(1, 0), (3, 2)].into_iter().collect();
        let children: HashMap<usize, Vec<usize>> =
            [(0, vec![1]), (2, vec![3])].into_iter().collect();

        let report = validate_tree_structure(&parents, &children, &set(&[0, 1, 2, 3]), 4);
        assert!(!report.is_healthy());
        assert!(report
            .issues
            .iter()
            .any(|i| i.message == "multiple roots"));
    }

    #[test]
    fn cobweb_tree_is_healthy_after_fitting() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut tree = CobwebTree::new();
        for i in 0..20 {
            let color = if i % 3 == 0 { "red" } else { "blue" };
            tree.ifit(
                &instance([("x", Value::from(i as f64)), ("color", Value::from(color))]),
                &mut rng,
            );
        }

        let report = tree.health_check();
        assert!(report.is_healthy(), "{}", report);
        assert!(report.leaf_count > 1);
        assert!(report.max_depth >= 1);
    }

    #[test]
    fn cobweb_tree_is_healthy_after_splitting_root_children() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut tree = CobwebTree::new();
        for i in 0..16 {
            tree.ifit(&instance([("x", Value::from((i % 4) as f64 * 10.0 + i as f64 * 0.01))]), &mut rng);
        }

        let root = tree.root();
        loop {
            let internal = tree
                .children(root)
                .iter()
                .copied()
                .find(|&c| !tree.children(c).is_empty());
            let Some(c) = internal else { break };
            tree.split(root, c);
        }

        let report = tree.health_check();
        assert!(report.is_healthy(), "{}", report);
        assert_eq!(report.max_depth, 1);
    }

    proptest! {
        #[test]
        fn cobweb_tree_stays_healthy(
            xs in proptest::collection::vec(-100.0f64..100.0, 1..40),
            colors in proptest::collection::vec(0usize..3, 40),
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut tree = CobwebTree::new();
            for (x, c) in xs.iter().zip(colors.iter()) {
                let inst: Instance = instance([
                    ("x", Value::from(*x)),
                    ("color", Value::from(["red", "green", "blue"][*c])),
                ]);
                tree.ifit(&inst, &mut rng);
            }

            let report = tree.health_check();
            prop_assert!(report.is_healthy(), "{}", report);
            prop_assert_eq!(tree.node(tree.root()).count(), xs.len() as f64);
        }
    }
}
