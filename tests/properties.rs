use proptest::prelude::*;

use eligibility_tree::{
    config::AttributeSchema,
    dataset::Record,
    engine,
    tree::TreeNode,
};

const ATTRIBUTES: [&str; 3] = ["gpa", "org", "major"];
const ORGS: [&str; 3] = ["Yes", "No", "Maybe"];
const MAJORS: [&str; 2] = ["CS", "Math"];
const LABELS: [&str; 2] = ["Recommended", "Not Recommended"];

fn record_strategy() -> impl Strategy<Value = Record> {
    (0u8..=40, 0..ORGS.len(), 0..MAJORS.len(), 0..LABELS.len()).prop_map(|(gpa, org, major, label)| {
        Record::new(LABELS[label])
            .with("gpa", f64::from(gpa) / 10.0)
            .with("org", ORGS[org])
            .with("major", MAJORS[major])
    })
}

/// The leaf `record` is routed to, following the same rules as prediction.
fn reached_leaf<'a>(tree: &'a TreeNode, record: &Record) -> Option<&'a TreeNode> {
    match tree {
        TreeNode::Leaf { .. } => Some(tree),
        TreeNode::Continuous { attribute, threshold, le, gt, .. } => {
            let goes_left = record.get(attribute).as_number().map_or(false, |v| v <= *threshold);
            reached_leaf(if goes_left { le } else { gt }, record)
        }
        TreeNode::Categorical { attribute, branches, .. } => {
            let key = record.get(attribute).branch_key();
            branches.iter().find(|b| b.value == key).and_then(|b| reached_leaf(&b.node, record))
        }
    }
}

proptest! {
    #[test]
    fn depth_never_exceeds_attribute_count(records in prop::collection::vec(record_strategy(), 0..40)) {
        let mut trace = Vec::new();
        let tree = engine::build_tree(&records, &ATTRIBUTES, &AttributeSchema::default(), None, &mut trace);
        prop_assert!(tree.depth() <= ATTRIBUTES.len());
    }

    #[test]
    fn categorical_gain_ratio_is_bounded(records in prop::collection::vec(record_strategy(), 1..40)) {
        let base = engine::entropy(&records);
        for attribute in ["org", "major"] {
            let score = engine::gain_ratio_categorical(&records, attribute, base);
            if score.split_info > 0.0 {
                prop_assert!(score.gain_ratio >= -1e-9 && score.gain_ratio <= 1.0 + 1e-9);
            } else {
                prop_assert_eq!(score.gain_ratio, 0.0);
            }
        }
    }

    #[test]
    fn training_records_reach_their_leaf(records in prop::collection::vec(record_strategy(), 1..40)) {
        let mut trace = Vec::new();
        let tree = engine::build_tree(&records, &ATTRIBUTES, &AttributeSchema::default(), None, &mut trace);
        for record in &records {
            let prediction = engine::predict(&tree, record);
            prop_assert!(!prediction.fallback);

            let leaf = reached_leaf(&tree, record);
            prop_assert!(leaf.is_some());
            let leaf = leaf.unwrap();
            prop_assert_eq!(leaf.decision(), Some(prediction.decision.as_str()));
            prop_assert!(leaf.stats().class_counts.get(&record.label) >= 1);
        }
    }
}
