//! Defines the core data structures of a trained decision tree: the node
//! sum type, per-node diagnostics, and the branch tests used by the
//! predictor and the visualizer.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::THRESHOLD_DECIMALS;
use crate::dataset::Record;
use crate::utils;

/// Per-class record counts, kept in the order classes are first encountered.
///
/// That order is the tie-break order for every majority vote in the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassCounts {
    counts: Vec<(String, usize)>,
}

impl ClassCounts {
    /// Counts labels over `records` in input order.
    pub fn from_records<R: Borrow<Record>>(records: &[R]) -> Self {
        let mut counts = ClassCounts::default();
        for record in records {
            counts.add(&Borrow::<Record>::borrow(record).label);
        }
        counts
    }

    /// Adds one observation of `class`.
    pub fn add(&mut self, class: &str) {
        match self.counts.iter_mut().find(|(c, _)| c == class) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((class.to_string(), 1)),
        }
    }

    pub fn get(&self, class: &str) -> usize {
        self.counts.iter().find(|(c, _)| c == class).map_or(0, |(_, n)| *n)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// Number of distinct classes observed.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `true` when exactly one class was observed.
    pub fn is_pure(&self) -> bool {
        self.counts.len() == 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(c, n)| (c.as_str(), *n))
    }

    /// Class with the highest count; ties go to the class seen first.
    /// Returns `None` when nothing was counted.
    pub fn majority(&self) -> Option<&str> {
        utils::first_max_by_count(self.iter())
    }
}

impl fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (class, n)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", class, n)?;
        }
        write!(f, "}}")
    }
}

/// Diagnostics retained on every node: how many training records reached it
/// and how they were distributed over the classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub samples: usize,
    pub class_counts: ClassCounts,
}

impl NodeStats {
    pub fn new(class_counts: ClassCounts) -> Self {
        NodeStats { samples: class_counts.total(), class_counts }
    }
}

/// The test a record must pass to follow a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BranchTest {
    /// `value <= threshold`
    AtMost(f64),
    /// `value > threshold`
    Above(f64),
    /// Categorical value equality, compared on the value's branch key.
    Equals(String),
}

impl fmt::Display for BranchTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchTest::AtMost(t) => write!(f, "<= {:.*}", THRESHOLD_DECIMALS, t),
            BranchTest::Above(t) => write!(f, "> {:.*}", THRESHOLD_DECIMALS, t),
            BranchTest::Equals(v) => write!(f, "= {}", v),
        }
    }
}

/// An attribute paired with a branch test, e.g. `gpa > 2.90` or `org = Yes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub test: BranchTest,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.attribute, self.test)
    }
}

/// One child of a categorical node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch key of the attribute value routed here.
    pub value: String,
    pub node: TreeNode,
}

/// A node of the trained tree.
///
/// Continuous splits always own exactly two children; categorical splits own
/// one child per value observed in the subset that reached them, in first-seen
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        decision: String,
        stats: NodeStats,
    },
    Continuous {
        attribute: String,
        threshold: f64,
        /// Taken when `value <= threshold`.
        le: Box<TreeNode>,
        /// Taken when `value > threshold` (or the value has no numeric reading).
        gt: Box<TreeNode>,
        stats: NodeStats,
    },
    Categorical {
        attribute: String,
        branches: Vec<Branch>,
        stats: NodeStats,
    },
}

/// A complete root-to-leaf rule.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRule {
    pub conditions: Vec<Condition>,
    pub decision: String,
    /// Training records that reached the leaf.
    pub samples: usize,
}

impl fmt::Display for DecisionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "ALWAYS -> {}", self.decision);
        }
        write!(f, "IF ")?;
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}", condition)?;
        }
        write!(f, " THEN {}", self.decision)
    }
}

impl TreeNode {
    pub fn leaf(decision: impl Into<String>, stats: NodeStats) -> Self {
        TreeNode::Leaf { decision: decision.into(), stats }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// The leaf's decision, `None` for internal nodes.
    pub fn decision(&self) -> Option<&str> {
        match self {
            TreeNode::Leaf { decision, .. } => Some(decision),
            _ => None,
        }
    }

    /// Splitting attribute, `None` for leaves.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Continuous { attribute, .. } | TreeNode::Categorical { attribute, .. } => Some(attribute),
        }
    }

    pub fn stats(&self) -> &NodeStats {
        match self {
            TreeNode::Leaf { stats, .. }
            | TreeNode::Continuous { stats, .. }
            | TreeNode::Categorical { stats, .. } => stats,
        }
    }

    /// Children paired with the test that selects them, in branch order.
    pub fn children(&self) -> Vec<(BranchTest, &TreeNode)> {
        match self {
            TreeNode::Leaf { .. } => Vec::new(),
            TreeNode::Continuous { threshold, le, gt, .. } => {
                vec![(BranchTest::AtMost(*threshold), le.as_ref()), (BranchTest::Above(*threshold), gt.as_ref())]
            }
            TreeNode::Categorical { branches, .. } => branches
                .iter()
                .map(|b| (BranchTest::Equals(b.value.clone()), &b.node))
                .collect(),
        }
    }

    /// Number of internal nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            _ => 1 + self.children().iter().map(|(_, c)| c.depth()).max().unwrap_or(0),
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|(_, c)| c.node_count()).sum::<usize>()
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            _ => self.children().iter().map(|(_, c)| c.leaf_count()).sum(),
        }
    }

    /// Every root-to-leaf rule, left to right.
    pub fn decision_paths(&self) -> Vec<DecisionRule> {
        let mut rules = Vec::new();
        let mut conditions = Vec::new();

        fn dfs(node: &TreeNode, conditions: &mut Vec<Condition>, rules: &mut Vec<DecisionRule>) {
            if let TreeNode::Leaf { decision, stats } = node {
                rules.push(DecisionRule {
                    conditions: conditions.clone(),
                    decision: decision.clone(),
                    samples: stats.samples,
                });
                return;
            }
            // Internal nodes always carry an attribute.
            let attribute = node.attribute().unwrap_or_default().to_string();
            for (test, child) in node.children() {
                conditions.push(Condition { attribute: attribute.clone(), test });
                dfs(child, conditions, rules);
                conditions.pop();
            }
        }

        dfs(self, &mut conditions, &mut rules);
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(decision: &str, n: usize) -> TreeNode {
        let mut counts = ClassCounts::default();
        for _ in 0..n {
            counts.add(decision);
        }
        TreeNode::leaf(decision, NodeStats::new(counts))
    }

    fn sample_tree() -> TreeNode {
        TreeNode::Continuous {
            attribute: "gpa".into(),
            threshold: 2.9,
            le: Box::new(leaf("B", 1)),
            gt: Box::new(TreeNode::Categorical {
                attribute: "org".into(),
                branches: vec![
                    Branch { value: "Yes".into(), node: leaf("A", 2) },
                    Branch { value: "No".into(), node: leaf("B", 1) },
                ],
                stats: NodeStats::default(),
            }),
            stats: NodeStats::default(),
        }
    }

    #[test]
    fn test_class_counts_first_seen_order() {
        let mut counts = ClassCounts::default();
        for class in ["B", "A", "A", "B"] {
            counts.add(class);
        }
        assert_eq!(counts.iter().collect::<Vec<_>>(), vec![("B", 2), ("A", 2)]);
        // Tie goes to the class counted first.
        assert_eq!(counts.majority(), Some("B"));
        counts.add("A");
        assert_eq!(counts.majority(), Some("A"));
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.get("C"), 0);
        assert_eq!(ClassCounts::default().majority(), None);
    }

    #[test]
    fn test_branch_test_labels() {
        assert_eq!(BranchTest::AtMost(2.9).to_string(), "<= 2.90");
        assert_eq!(BranchTest::Above(3.456).to_string(), "> 3.46");
        assert_eq!(BranchTest::Equals("Yes".into()).to_string(), "= Yes");
    }

    #[test]
    fn test_tree_shape_metrics() {
        let tree = sample_tree();
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(leaf("A", 1).depth(), 0);
    }

    #[test]
    fn test_decision_paths() {
        let rules = sample_tree().decision_paths();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].to_string(), "IF gpa <= 2.90 THEN B");
        assert_eq!(rules[1].to_string(), "IF gpa > 2.90 AND org = Yes THEN A");
        assert_eq!(rules[1].samples, 2);
        assert_eq!(leaf("A", 1).decision_paths()[0].to_string(), "ALWAYS -> A");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(&sample_tree()).unwrap();
        assert_eq!(json["type"], "continuous");
        assert_eq!(json["gt"]["branches"][0]["value"], "Yes");
        assert_eq!(json["le"]["stats"]["class_counts"][0][0], "B");
        let back: TreeNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample_tree());
    }
}
