//! Text renderings of a trained tree and of the training trace, for
//! inspection and debugging. The output is not meant to be parsed.

use std::fmt::Write;

use crate::tree::{Condition, TreeNode};
use super::builder::TraceEntry;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const GUIDE: &str = "│   ";
const BLANK: &str = "    ";

/// Renders the tree as an indented diagram, one line per node.
///
/// ```text
/// ├── gpa <= 2.90
/// │   --> Not Recommended
/// └── gpa > 2.90
///     --> Recommended
/// ```
pub fn visualize(tree: &TreeNode) -> String {
    let mut out = String::new();
    render_node(tree, "", false, &mut out);
    out
}

/// Same diagram with each node's sample count and class distribution appended.
pub fn visualize_detailed(tree: &TreeNode) -> String {
    let mut out = String::new();
    render_node(tree, "", true, &mut out);
    out
}

/// Recursive helper printing a node's children below `prefix`.
///
/// # Arguments
/// * `node` - The node whose subtree is rendered.
/// * `prefix` - Guides inherited from the ancestors.
/// * `detailed` - Append `(n=.., {class: count})` diagnostics.
/// * `out` - Buffer receiving the lines.
fn render_node(node: &TreeNode, prefix: &str, detailed: bool, out: &mut String) {
    if let TreeNode::Leaf { decision, stats } = node {
        // Writing into a String cannot fail.
        let _ = write!(out, "{}--> {}", prefix, decision);
        if detailed {
            let _ = write!(out, " (n={}, {})", stats.samples, stats.class_counts);
        }
        out.push('\n');
        return;
    }

    let attribute = node.attribute().unwrap_or_default();
    let children = node.children();
    let last_index = children.len().saturating_sub(1);

    for (i, (test, child)) in children.into_iter().enumerate() {
        let is_last = i == last_index;
        let condition = Condition { attribute: attribute.to_string(), test };
        let connector = if is_last { LAST_BRANCH } else { BRANCH };

        let _ = write!(out, "{}{}{}", prefix, connector, condition);
        if detailed {
            let _ = write!(out, " (n={})", child.stats().samples);
        }
        out.push('\n');

        let child_prefix = format!("{}{}", prefix, if is_last { BLANK } else { GUIDE });
        render_node(child, &child_prefix, detailed, out);
    }
}

/// Renders the training trace: one block per attribute search with every
/// candidate's gain ratio, the chosen attribute marked with `*`.
pub fn format_trace(trace: &[TraceEntry]) -> String {
    let mut out = String::new();
    for entry in trace {
        let indent = "  ".repeat(entry.depth);
        let outcome = match (&entry.chosen, entry.split) {
            (Some(attribute), true) => format!("split on {}", attribute),
            (Some(attribute), false) => format!("leaf (best was {}, no gain)", attribute),
            (None, _) => "leaf (no candidates)".to_string(),
        };
        let _ = writeln!(
            out,
            "{}[depth {}] n={} entropy={:.4} -> {}",
            indent, entry.depth, entry.samples, entry.entropy, outcome
        );
        for score in &entry.scores {
            let marker = if entry.chosen.as_deref() == Some(score.attribute.as_str()) { '*' } else { ' ' };
            let threshold = score.threshold.map(|t| format!(" @ {:.2}", t)).unwrap_or_default();
            let _ = writeln!(
                out,
                "{}  {} {:<16} {:<11} ratio={:>7.4} gain={:.4} split={:.4}{}",
                indent, marker, score.attribute, score.kind.to_string(), score.gain_ratio, score.information_gain, score.split_info, threshold
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Branch, ClassCounts, NodeStats};

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
    fn test_visualize_nested() {
        let expected = "\
├── gpa <= 2.90
│   --> B
└── gpa > 2.90
    ├── org = Yes
    │   --> A
    └── org = No
        --> B
";
        assert_eq!(visualize(&sample_tree()), expected);
    }

    #[test]
    fn test_visualize_leaf_root() {
        assert_eq!(visualize(&leaf("A", 3)), "--> A\n");
        assert_eq!(visualize_detailed(&leaf("A", 3)), "--> A (n=3, {A: 3})\n");
    }

    #[test]
    fn test_visualize_detailed_counts() {
        let rendered = visualize_detailed(&sample_tree());
        assert!(rendered.contains("├── gpa <= 2.90 (n=1)"));
        assert!(rendered.contains("    │   --> A (n=2, {A: 2})"));
    }

    #[test]
    fn test_format_trace_marks_choice() {
        use crate::config::AttributeKind;
        use crate::engine::gain::AttributeScore;

        let trace = vec![TraceEntry {
            depth: 0,
            chosen: Some("gpa".into()),
            samples: 3,
            entropy: 0.9183,
            scores: vec![AttributeScore {
                attribute: "gpa".into(),
                kind: AttributeKind::Continuous,
                gain_ratio: 1.0,
                information_gain: 0.9183,
                split_info: 0.9183,
                threshold: Some(2.9),
            }],
            split: true,
        }];
        let rendered = format_trace(&trace);
        assert!(rendered.starts_with("[depth 0] n=3 entropy=0.9183 -> split on gpa\n"));
        assert!(rendered.contains("* gpa"));
        assert!(rendered.contains("@ 2.90"));
    }
}
