//! Walks a trained tree for a single record and records the conditions
//! evaluated on the way, so that every decision can be justified.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::NOT_RECOMMENDED;
use crate::dataset::{Record, Value};
use crate::tree::{BranchTest, TreeNode};
use crate::utils;

/// One entry of a decision path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathStep {
    /// An internal node tested `attribute`; `threshold` is set for continuous nodes.
    Condition {
        attribute: String,
        value: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f64>,
    },
    /// The leaf that was reached.
    Decision { decision: String },
}

impl PathStep {
    /// The branch test this step satisfied, `None` for the decision step.
    pub fn test(&self) -> Option<BranchTest> {
        match self {
            PathStep::Condition { value, threshold: Some(t), .. } => {
                if value.as_number().map_or(false, |v| v <= *t) {
                    Some(BranchTest::AtMost(*t))
                } else {
                    Some(BranchTest::Above(*t))
                }
            }
            PathStep::Condition { value, threshold: None, .. } => Some(BranchTest::Equals(value.branch_key())),
            PathStep::Decision { .. } => None,
        }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.test()) {
            (PathStep::Condition { attribute, .. }, Some(test)) => write!(f, "{} {}", attribute, test),
            (PathStep::Condition { attribute, value, .. }, None) => write!(f, "{} = {}", attribute, value),
            (PathStep::Decision { decision }, _) => write!(f, "--> {}", decision),
        }
    }
}

/// Result of walking the tree for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub decision: String,
    /// Conditions evaluated in order; ends with a `Decision` step unless
    /// `fallback` is set.
    pub path: Vec<PathStep>,
    /// `true` when the record carried a categorical value with no branch and
    /// the decision came from the node's immediate children.
    pub fallback: bool,
}

impl Prediction {
    /// Human-readable justification, e.g. `Recommended because gpa > 2.90 and org = Yes`.
    pub fn explanation(&self) -> String {
        let conditions: Vec<String> = self
            .path
            .iter()
            .filter(|step| matches!(step, PathStep::Condition { .. }))
            .map(|step| step.to_string())
            .collect();

        if self.fallback {
            let unseen = match self.path.last() {
                Some(PathStep::Condition { attribute, value, .. }) => format!("{} = {}", attribute, value),
                _ => String::from("an unseen value"),
            };
            let known: Vec<&String> = conditions.iter().take(conditions.len().saturating_sub(1)).collect();
            let prefix = if known.is_empty() {
                String::new()
            } else {
                format!(" after {}", known.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" and "))
            };
            return format!(
                "{} by majority of known branches{}: {} was not seen in training",
                self.decision, prefix, unseen
            );
        }

        if conditions.is_empty() {
            return format!("{} for every applicant", self.decision);
        }
        format!("{} because {}", self.decision, conditions.join(" and "))
    }
}

/// Walks `tree` for `record`, returning the decision and the path taken.
///
/// At a categorical node whose branches do not include the record's value,
/// the walk stops and returns the majority of the immediate children's
/// decisions (internal children have none); ties go to the first branch and
/// `NOT_RECOMMENDED` is returned when no child is a leaf.
pub fn predict(tree: &TreeNode, record: &Record) -> Prediction {
    let mut path = Vec::new();
    let mut node = tree;

    loop {
        match node {
            TreeNode::Leaf { decision, .. } => {
                path.push(PathStep::Decision { decision: decision.clone() });
                return Prediction { decision: decision.clone(), path, fallback: false };
            }
            TreeNode::Continuous { attribute, threshold, le, gt, .. } => {
                let value = record.get(attribute);
                path.push(PathStep::Condition {
                    attribute: attribute.clone(),
                    value: value.clone(),
                    threshold: Some(*threshold),
                });
                node = if value.as_number().map_or(false, |v| v <= *threshold) { le } else { gt };
            }
            TreeNode::Categorical { attribute, branches, .. } => {
                let value = record.get(attribute);
                let key = value.branch_key();
                path.push(PathStep::Condition { attribute: attribute.clone(), value: value.clone(), threshold: None });

                match branches.iter().find(|b| b.value == key) {
                    Some(branch) => node = &branch.node,
                    None => {
                        let decision = utils::majority_vote(branches.iter().filter_map(|b| b.node.decision()))
                            .unwrap_or(NOT_RECOMMENDED)
                            .to_string();
                        return Prediction { decision, path, fallback: true };
                    }
                }
            }
        }
    }
}

/// Predicts every record in order.
pub fn predict_all(tree: &TreeNode, records: &[Record]) -> Vec<Prediction> {
    records.iter().map(|record| predict(tree, record)).collect()
}
