//! Information-theoretic scoring of candidate split attributes.
//!
//! All logarithms are base 2. Gain ratios are compared with a plain strict
//! `>` and no epsilon, so the first candidate wins any exact tie.

use std::borrow::Borrow;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::config::{AttributeKind, AttributeSchema, UNUSABLE_GAIN_RATIO};
use crate::dataset::Record;
use crate::tree::ClassCounts;
use crate::utils::entropy_of_counts;

/// Score of one candidate attribute at one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeScore {
    pub attribute: String,
    pub kind: AttributeKind,
    /// `information_gain / split_info`; 0 when `split_info` is 0, and
    /// `UNUSABLE_GAIN_RATIO` for a continuous attribute with no usable threshold.
    pub gain_ratio: f64,
    pub information_gain: f64,
    pub split_info: f64,
    /// Best threshold, for continuous attributes that have one.
    pub threshold: Option<f64>,
}

impl AttributeScore {
    /// `true` if this score can drive a split (the builder's stopping rule).
    #[inline]
    pub fn improves(&self) -> bool {
        self.gain_ratio > 0.0
    }
}

/// Outcome of scoring every candidate attribute at a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeSelection {
    /// Winning candidate, `None` only when there were no candidates.
    pub best: Option<AttributeScore>,
    /// One score per candidate, in candidate order.
    pub scores: Vec<AttributeScore>,
}

impl AttributeSelection {
    pub fn best_attribute(&self) -> Option<&str> {
        self.best.as_ref().map(|s| s.attribute.as_str())
    }

    pub fn best_threshold(&self) -> Option<f64> {
        self.best.as_ref().and_then(|s| s.threshold)
    }
}

// --- Partitioning ---

/// Groups records by the branch key of `attribute`, groups in first-seen order.
pub fn partition_by_value<'a, R: Borrow<Record>>(records: &'a [R], attribute: &str) -> Vec<(String, Vec<&'a Record>)> {
    let mut groups: Vec<(String, Vec<&'a Record>)> = Vec::new();
    for record in records {
        let record: &Record = Borrow::<Record>::borrow(record);
        let key = record.get(attribute).branch_key();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(record),
            None => groups.push((key, vec![record])),
        }
    }
    groups
}

/// Splits records on `attribute <= threshold`.
///
/// Records without a numeric reading for `attribute` fail the test and land on
/// the `> threshold` side.
///
/// # Returns
/// `(at_most, above)`, each preserving input order.
pub fn partition_by_threshold<'a, R: Borrow<Record>>(
    records: &'a [R],
    attribute: &str,
    threshold: f64,
) -> (Vec<&'a Record>, Vec<&'a Record>) {
    records
        .iter()
        .map(|r| Borrow::<Record>::borrow(r))
        .partition(|record: &&Record| record.get(attribute).as_number().map_or(false, |v| v <= threshold))
}

/// Candidate thresholds for a continuous attribute: midpoints between
/// consecutive distinct observed values, or the value itself when only one
/// distinct value was observed.
pub fn candidate_thresholds<R: Borrow<Record>>(records: &[R], attribute: &str) -> Vec<f64> {
    let mut values: Vec<f64> = records
        .iter()
        .filter_map(|r| Borrow::<Record>::borrow(r).get(attribute).as_number())
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();

    match values.len() {
        0 => Vec::new(),
        1 => values,
        _ => values.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect(),
    }
}

// --- Scores ---

/// Shannon entropy of the label distribution. 0 for an empty set.
pub fn entropy<R: Borrow<Record>>(records: &[R]) -> f64 {
    let counts = ClassCounts::from_records(records);
    entropy_of_counts(counts.iter().map(|(_, n)| n).collect::<Vec<_>>())
}

/// Size-weighted average entropy of a set of partitions.
fn weighted_entropy(total: usize, parts: &[&[&Record]]) -> f64 {
    if total == 0 {
        return 0.0;
    }
    parts
        .iter()
        .map(|part| (part.len() as f64 / total as f64) * entropy(*part))
        .sum()
}

/// Gain ratio of splitting `records` on every distinct value of `attribute`.
///
/// # Arguments
/// * `records` - The records reaching the node.
/// * `attribute` - Candidate attribute.
/// * `base_entropy` - `entropy(records)`, computed once per node by the caller.
///
/// # Returns
/// A score whose gain ratio is 0 when the attribute takes a single value
/// (zero split information).
pub fn gain_ratio_categorical<R: Borrow<Record>>(records: &[R], attribute: &str, base_entropy: f64) -> AttributeScore {
    let groups = partition_by_value(records, attribute);
    let parts: Vec<&[&Record]> = groups.iter().map(|(_, members)| members.as_slice()).collect();

    let new_entropy = weighted_entropy(records.len(), &parts);
    let information_gain = base_entropy - new_entropy;
    let split_info = entropy_of_counts(parts.iter().map(|p| p.len()).collect::<Vec<_>>());
    let gain_ratio = if split_info == 0.0 { 0.0 } else { information_gain / split_info };

    AttributeScore {
        attribute: attribute.to_string(),
        kind: AttributeKind::Categorical,
        gain_ratio,
        information_gain,
        split_info,
        threshold: None,
    }
}

/// Best binary threshold split of `records` on a continuous `attribute`.
///
/// Candidates producing an empty side are skipped. Among the rest the first
/// candidate with the strictly highest gain ratio is kept.
///
/// # Returns
/// The winning threshold's score, or a score with gain ratio
/// `UNUSABLE_GAIN_RATIO` and no threshold when no candidate splits the records.
pub fn gain_ratio_continuous<R: Borrow<Record>>(records: &[R], attribute: &str, base_entropy: f64) -> AttributeScore {
    let mut best = AttributeScore {
        attribute: attribute.to_string(),
        kind: AttributeKind::Continuous,
        gain_ratio: UNUSABLE_GAIN_RATIO,
        information_gain: 0.0,
        split_info: 0.0,
        threshold: None,
    };

    for threshold in candidate_thresholds(records, attribute) {
        let (at_most, above) = partition_by_threshold(records, attribute, threshold);
        if at_most.is_empty() || above.is_empty() {
            continue;
        }

        let new_entropy = weighted_entropy(records.len(), &[at_most.as_slice(), above.as_slice()]);
        let information_gain = base_entropy - new_entropy;
        let split_info = entropy_of_counts([at_most.len(), above.len()]);
        let gain_ratio = if split_info == 0.0 { 0.0 } else { information_gain / split_info };

        trace!("{} <= {:.4}: gain={:.4} split_info={:.4} ratio={:.4}", attribute, threshold, information_gain, split_info, gain_ratio);

        if best.threshold.is_none() || gain_ratio > best.gain_ratio {
            best.gain_ratio = gain_ratio;
            best.information_gain = information_gain;
            best.split_info = split_info;
            best.threshold = Some(threshold);
        }
    }
    best
}

/// Scores `attribute` with the routine its schema kind calls for.
pub fn score_attribute<R: Borrow<Record>>(
    records: &[R],
    attribute: &str,
    schema: &AttributeSchema,
    base_entropy: f64,
) -> AttributeScore {
    match schema.kind(attribute) {
        AttributeKind::Continuous => gain_ratio_continuous(records, attribute, base_entropy),
        AttributeKind::Categorical => gain_ratio_categorical(records, attribute, base_entropy),
    }
}

/// Scores every candidate and selects the strictly highest gain ratio.
///
/// Ties go to the earlier attribute in `attributes`. An empty candidate list
/// yields no best attribute.
pub fn find_best_attribute<R: Borrow<Record>, S: AsRef<str>>(
    records: &[R],
    attributes: &[S],
    schema: &AttributeSchema,
) -> AttributeSelection {
    let base_entropy = entropy(records);
    let mut selection = AttributeSelection::default();

    for attribute in attributes {
        let score = score_attribute(records, attribute.as_ref(), schema, base_entropy);
        trace!("{} ({}): gain ratio {:.4}", score.attribute, score.kind, score.gain_ratio);

        let is_better = selection.best.as_ref().map_or(true, |best| score.gain_ratio > best.gain_ratio);
        if is_better {
            selection.best = Some(score.clone());
        }
        selection.scores.push(score);
    }
    selection
}
