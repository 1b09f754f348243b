//! Implements the recursive partitioning that grows a decision tree from a
//! labeled set of records.
//!
//! Every internal node removes its splitting attribute from the candidates
//! handed to its subtree, so the depth of any path is bounded by the number of
//! candidate attributes and recursion always terminates.

use std::borrow::Borrow;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{AttributeKind, AttributeSchema, NOT_RECOMMENDED};
use crate::dataset::Record;
use crate::tree::{Branch, ClassCounts, NodeStats, TreeNode};
use super::gain::{self, AttributeScore};

// --- Training Trace ---

/// Diagnostic record of one attribute search, appended for every node that
/// reached the attribute-selection step.
///
/// The trace is a side channel for inspection; it never influences the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Depth of the node (root is 0).
    pub depth: usize,
    /// Attribute with the highest gain ratio, if there were candidates.
    pub chosen: Option<String>,
    /// Number of records that reached the node.
    pub samples: usize,
    /// Label entropy of those records.
    pub entropy: f64,
    /// One score per candidate attribute, in candidate order.
    pub scores: Vec<AttributeScore>,
    /// Whether the node was split (`false` when the stopping rule fired).
    pub split: bool,
}

// --- Tree Builder ---

/// Grows a tree over borrowed records, appending diagnostics to a trace sink.
pub struct TreeBuilder<'s> {
    schema: &'s AttributeSchema,
    trace: &'s mut Vec<TraceEntry>,
}

impl<'s> TreeBuilder<'s> {
    /// Creates a new `TreeBuilder`.
    ///
    /// # Arguments
    /// * `schema` - Lookup table deciding which attributes are continuous.
    /// * `trace` - Sink receiving one `TraceEntry` per attribute search.
    pub fn new(schema: &'s AttributeSchema, trace: &'s mut Vec<TraceEntry>) -> Self {
        TreeBuilder { schema, trace }
    }

    /// Builds the subtree for `records`.
    ///
    /// In order of precedence:
    /// 1. The majority class is computed (ties go to the class seen first);
    ///    with no records it falls back to `default_label`.
    /// 2. No records or no attributes left: majority leaf.
    /// 3. All records share one class: leaf for that class.
    /// 4. Otherwise the best attribute is searched and traced; a non-positive
    ///    gain ratio stops with a majority leaf.
    /// 5. Otherwise the node splits and each partition recurses without the
    ///    chosen attribute, inheriting this node's majority as its default.
    pub fn build(&mut self, records: &[&Record], attributes: &[&str], default_label: &str, depth: usize) -> TreeNode {
        let counts = ClassCounts::from_records(records);
        let majority = counts.majority().unwrap_or(default_label).to_string();

        if records.is_empty() || attributes.is_empty() {
            return TreeNode::leaf(majority, NodeStats::new(counts));
        }
        if counts.is_pure() {
            return TreeNode::leaf(majority, NodeStats::new(counts));
        }

        let base_entropy = gain::entropy(records);
        let selection = gain::find_best_attribute(records, attributes, self.schema);
        let best = selection.best.clone().filter(AttributeScore::improves);

        self.trace.push(TraceEntry {
            depth,
            chosen: selection.best_attribute().map(str::to_string),
            samples: records.len(),
            entropy: base_entropy,
            scores: selection.scores,
            split: best.is_some(),
        });

        let best = match best {
            Some(best) => best,
            None => {
                debug!("Stopping at depth {} with {} records: no attribute improves on {}", depth, records.len(), majority);
                return TreeNode::leaf(majority, NodeStats::new(counts));
            }
        };

        let remaining: Vec<&str> = attributes.iter().copied().filter(|a| *a != best.attribute).collect();
        let stats = NodeStats::new(counts);

        match (best.kind, best.threshold) {
            (AttributeKind::Continuous, Some(threshold)) => {
                debug!(
                    "Depth {}: split {} records on {} <= {:.4} (gain ratio {:.4})",
                    depth, records.len(), best.attribute, threshold, best.gain_ratio
                );
                let (at_most, above) = gain::partition_by_threshold(records, &best.attribute, threshold);
                let le = self.build(&at_most, &remaining, &majority, depth + 1);
                let gt = self.build(&above, &remaining, &majority, depth + 1);
                TreeNode::Continuous {
                    attribute: best.attribute,
                    threshold,
                    le: Box::new(le),
                    gt: Box::new(gt),
                    stats,
                }
            }
            (AttributeKind::Continuous, None) => {
                // A positive continuous score always carries its threshold.
                TreeNode::leaf(majority, stats)
            }
            (AttributeKind::Categorical, _) => {
                let groups = gain::partition_by_value(records, &best.attribute);
                debug!(
                    "Depth {}: split {} records on {} into {} branches (gain ratio {:.4})",
                    depth, records.len(), best.attribute, groups.len(), best.gain_ratio
                );
                let branches = groups
                    .into_iter()
                    .map(|(value, members)| {
                        let node = self.build(&members, &remaining, &majority, depth + 1);
                        Branch { value, node }
                    })
                    .collect();
                TreeNode::Categorical { attribute: best.attribute, branches, stats }
            }
        }
    }
}

/// Builds a decision tree from labeled records.
///
/// # Arguments
/// * `records` - Training records; never modified.
/// * `attributes` - Candidate attributes, in tie-break priority order.
/// * `schema` - Lookup table deciding which attributes are continuous.
/// * `default_label` - Decision when `records` is empty. `None` falls back to `NOT_RECOMMENDED`.
/// * `trace` - Sink receiving one entry per attribute search.
///
/// # Returns
/// The root of the trained tree.
pub fn build_tree<R: Borrow<Record>, S: AsRef<str>>(
    records: &[R],
    attributes: &[S],
    schema: &AttributeSchema,
    default_label: Option<&str>,
    trace: &mut Vec<TraceEntry>,
) -> TreeNode {
    let records: Vec<&Record> = records.iter().map(|r| Borrow::<Record>::borrow(r)).collect();
    let attributes: Vec<&str> = attributes.iter().map(AsRef::as_ref).collect();
    let default_label = default_label.unwrap_or(NOT_RECOMMENDED);

    TreeBuilder::new(schema, trace).build(&records, &attributes, default_label, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(label: &str) -> Record {
        Record::new(label)
    }

    fn build(records: &[Record], attributes: &[&str], default_label: Option<&str>) -> (TreeNode, Vec<TraceEntry>) {
        let mut trace = Vec::new();
        let tree = build_tree(records, attributes, &AttributeSchema::default(), default_label, &mut trace);
        (tree, trace)
    }

    #[test]
    fn test_empty_records_use_default_label() {
        let (tree, trace) = build(&[], &["gpa", "org"], Some("A"));
        assert_eq!(tree.decision(), Some("A"));
        assert_eq!(tree.stats().samples, 0);
        assert!(trace.is_empty());

        let (fallback, _) = build(&[], &["gpa"], None);
        assert_eq!(fallback.decision(), Some(NOT_RECOMMENDED));
    }

    #[test]
    fn test_no_attributes_gives_majority_leaf() {
        let records = vec![rec("B"), rec("A"), rec("A")];
        let (tree, trace) = build(&records, &[], Some("B"));
        assert_eq!(tree.decision(), Some("A"));
        assert!(trace.is_empty());
    }

    #[test]
    fn test_pure_records_short_circuit() {
        let records = vec![rec("A").with("org", "Yes"), rec("A").with("org", "No")];
        let (tree, trace) = build(&records, &["org"], None);
        assert_eq!(tree.decision(), Some("A"));
        // Purity is checked before any attribute search.
        assert!(trace.is_empty());
    }

    #[test]
    fn test_conflicting_duplicates_tie_break_by_first_seen() {
        let ab = vec![rec("A").with("org", "Yes"), rec("B").with("org", "Yes")];
        let (tree, trace) = build(&ab, &["org"], None);
        assert_eq!(tree.decision(), Some("A"));
        assert_eq!(trace.len(), 1);
        assert!(!trace[0].split);
        assert_eq!(trace[0].chosen.as_deref(), Some("org"));

        let ba = vec![rec("B").with("org", "Yes"), rec("A").with("org", "Yes")];
        let (tree, _) = build(&ba, &["org"], None);
        assert_eq!(tree.decision(), Some("B"));
    }

    #[test]
    fn test_continuous_scenario() {
        let records = vec![
            rec("A").with("gpa", 3.8),
            rec("A").with("gpa", 3.8),
            rec("B").with("gpa", 2.0),
        ];
        let (tree, trace) = build(&records, &["gpa"], None);
        match &tree {
            TreeNode::Continuous { attribute, threshold, le, gt, stats } => {
                assert_eq!(attribute, "gpa");
                assert!((threshold - 2.9).abs() < 1e-12);
                assert_eq!(le.decision(), Some("B"));
                assert_eq!(gt.decision(), Some("A"));
                assert_eq!(stats.samples, 3);
            }
            other => panic!("expected a continuous split, got {:?}", other),
        }
        assert_eq!(trace.len(), 1);
        assert!(trace[0].split);
        assert!(trace[0].scores[0].gain_ratio > 0.0);
    }

    #[test]
    fn test_categorical_branches_only_for_observed_values() {
        let records = vec![
            rec("A").with("org", "Yes").with("gpa", 3.9),
            rec("B").with("org", "No").with("gpa", 3.9),
            rec("A").with("org", "Yes").with("gpa", 2.1),
        ];
        let (tree, _) = build(&records, &["org", "gpa"], None);
        match &tree {
            TreeNode::Categorical { attribute, branches, .. } => {
                assert_eq!(attribute, "org");
                let values: Vec<&str> = branches.iter().map(|b| b.value.as_str()).collect();
                assert_eq!(values, vec!["Yes", "No"]);
                assert_eq!(branches[0].node.decision(), Some("A"));
                assert_eq!(branches[1].node.decision(), Some("B"));
            }
            other => panic!("expected a categorical split, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_not_reused_on_path() {
        // After splitting on org the gpa split is the only remaining option.
        let records = vec![
            rec("A").with("org", "Yes").with("gpa", 3.9),
            rec("B").with("org", "Yes").with("gpa", 2.0),
            rec("B").with("org", "No").with("gpa", 3.5),
            rec("B").with("org", "No").with("gpa", 2.5),
        ];
        let (tree, _) = build(&records, &["org", "gpa"], None);
        assert!(tree.depth() <= 2);
        for rule in tree.decision_paths() {
            let mut seen: Vec<&str> = rule.conditions.iter().map(|c| c.attribute.as_str()).collect();
            let before = seen.len();
            seen.dedup();
            assert_eq!(seen.len(), before);
        }
    }
}
