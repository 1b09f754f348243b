//! Measuring a trained model against labelled records: batch evaluation
//! and seeded k-fold cross-validation.

use std::borrow::Borrow;
use std::time::Duration;

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
#[cfg(not(feature = "non-parallel"))]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::AttributeSchema;
use crate::dataset::Record;
use crate::error::EngineError;
use crate::model::DecisionTreeModel;
use crate::utils::{calculate_duration_stats, calculate_stats};

pub use crate::results::write_outcomes_csv;

/// What the model said about one evaluated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Position of the record in the evaluated slice.
    pub index: usize,
    pub actual: String,
    pub predicted: String,
    pub correct: bool,
    pub fallback: bool,
    pub explanation: String,
}

/// Counts of (actual, predicted) pairs. Classes are listed in the order they
/// were first met, scanning actual then predicted label of each outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub classes: Vec<String>,
    /// `counts[actual][predicted]`, indexed like `classes`.
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    fn class_index(&mut self, class: &str) -> usize {
        if let Some(i) = self.classes.iter().position(|c| c == class) {
            return i;
        }
        self.classes.push(class.to_string());
        for row in &mut self.counts {
            row.push(0);
        }
        self.counts.push(vec![0; self.classes.len()]);
        self.classes.len() - 1
    }

    pub fn record(&mut self, actual: &str, predicted: &str) {
        let a = self.class_index(actual);
        let p = self.class_index(predicted);
        self.counts[a][p] += 1;
    }

    /// Number of records labelled `actual` that were predicted as `predicted`.
    pub fn get(&self, actual: &str, predicted: &str) -> usize {
        let a = self.classes.iter().position(|c| c == actual);
        let p = self.classes.iter().position(|c| c == predicted);
        match (a, p) {
            (Some(a), Some(p)) => self.counts[a][p],
            _ => 0,
        }
    }
}

/// Batch evaluation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub total: usize,
    pub correct: usize,
    /// `correct / total`, 0 for an empty batch.
    pub accuracy: f64,
    /// Predictions that came from the unseen-category fallback.
    pub fallback_count: usize,
    pub confusion: ConfusionMatrix,
    pub outcomes: Vec<Outcome>,
}

/// Predicts every record with `model` and compares against its label.
pub fn evaluate<R: Borrow<Record>>(model: &DecisionTreeModel, records: &[R]) -> Evaluation {
    let mut confusion = ConfusionMatrix::default();
    let mut outcomes = Vec::with_capacity(records.len());
    let mut correct = 0;
    let mut fallback_count = 0;

    for (index, record) in records.iter().enumerate() {
        let record = Borrow::<Record>::borrow(record);
        let prediction = model.predict(record);
        let is_correct = prediction.decision == record.label;
        if is_correct {
            correct += 1;
        }
        if prediction.fallback {
            fallback_count += 1;
        }
        confusion.record(&record.label, &prediction.decision);
        outcomes.push(Outcome {
            index,
            actual: record.label.clone(),
            predicted: prediction.decision.clone(),
            correct: is_correct,
            fallback: prediction.fallback,
            explanation: prediction.explanation(),
        });
    }

    let total = records.len();
    let accuracy = if total == 0 { 0.0 } else { correct as f64 / total as f64 };
    Evaluation { total, correct, accuracy, fallback_count, confusion, outcomes }
}

/// One fold of a cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
    pub fallback_count: usize,
    pub depth: usize,
    pub node_count: usize,
    pub train_time: Duration,
}

/// Min, median, max, mean and population standard deviation of a measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub min: f64,
    pub median: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<(f64, f64, f64, f64, f64)> for Summary {
    fn from((min, median, max, mean, std_dev): (f64, f64, f64, f64, f64)) -> Self {
        Summary { min, median, max, mean, std_dev }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub seed: u64,
    pub folds: Vec<FoldResult>,
    pub accuracy: Summary,
    /// Training wall time per fold, in seconds.
    pub train_time: Summary,
}

/// Shuffles `0..n` with a seeded Fisher-Yates pass.
fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    for i in 0..n.saturating_sub(1) {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices
}

/// Trains on every fold but `fold` and evaluates on `fold`.
fn run_fold<S: AsRef<str> + Sync>(
    records: &[Record],
    assignment: &[usize],
    fold: usize,
    attributes: &[S],
    schema: &AttributeSchema,
) -> FoldResult {
    let mut train: Vec<&Record> = Vec::new();
    let mut test: Vec<&Record> = Vec::new();
    for (record, &f) in records.iter().zip(assignment) {
        if f == fold {
            test.push(record);
        } else {
            train.push(record);
        }
    }

    let model = DecisionTreeModel::train(&train, attributes, schema.clone(), None);
    let evaluation = evaluate(&model, &test);
    debug!("Fold {}: {}/{} correct", fold, evaluation.correct, evaluation.total);

    FoldResult {
        fold,
        train_size: train.len(),
        test_size: test.len(),
        accuracy: evaluation.accuracy,
        fallback_count: evaluation.fallback_count,
        depth: model.stats.depth,
        node_count: model.stats.node_count,
        train_time: model.stats.timing.wall,
    }
}

/// Shuffled k-fold cross-validation.
///
/// Records are shuffled deterministically from `seed` and dealt round-robin
/// into `folds` folds, so fold sizes differ by at most one. Each fold trains a
/// fresh tree on the others.
///
/// # Errors
/// `EngineError::InvalidConfig` unless `2 <= folds <= records.len()`.
pub fn cross_validate<S: AsRef<str> + Sync>(
    records: &[Record],
    attributes: &[S],
    schema: &AttributeSchema,
    folds: usize,
    seed: u64,
) -> Result<CrossValidation, EngineError> {
    if folds < 2 || folds > records.len() {
        return Err(EngineError::InvalidConfig(format!(
            "cannot run {}-fold cross-validation on {} records",
            folds,
            records.len()
        )));
    }

    let mut assignment = vec![0; records.len()];
    for (position, &index) in shuffled_indices(records.len(), seed).iter().enumerate() {
        assignment[index] = position % folds;
    }

    #[cfg(feature = "non-parallel")]
    let results: Vec<FoldResult> =
        (0..folds).map(|fold| run_fold(records, &assignment, fold, attributes, schema)).collect();
    #[cfg(not(feature = "non-parallel"))]
    let results: Vec<FoldResult> =
        (0..folds).into_par_iter().map(|fold| run_fold(records, &assignment, fold, attributes, schema)).collect();

    let accuracies: Vec<f64> = results.iter().map(|r| r.accuracy).collect();
    let durations: Vec<Duration> = results.iter().map(|r| r.train_time).collect();
    let accuracy = Summary::from(calculate_stats(&accuracies));
    let train_time = Summary::from(calculate_duration_stats(&durations));
    info!(
        "{}-fold cross-validation: mean accuracy {:.3} (std {:.3})",
        folds, accuracy.mean, accuracy.std_dev
    );

    Ok(CrossValidation { seed, folds: results, accuracy, train_time })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn records() -> Vec<Record> {
        vec![
            Record::new("Recommended").with("gpa", 3.8).with("org", "Yes"),
            Record::new("Recommended").with("gpa", 3.5).with("org", "No"),
            Record::new("Recommended").with("gpa", 3.9).with("org", "Yes"),
            Record::new("Not Recommended").with("gpa", 2.0).with("org", "Yes"),
            Record::new("Not Recommended").with("gpa", 2.4).with("org", "No"),
            Record::new("Not Recommended").with("gpa", 1.8).with("org", "No"),
        ]
    }

    fn model() -> DecisionTreeModel {
        DecisionTreeModel::train(&records(), &["gpa", "org"], AttributeSchema::default(), None)
    }

    #[test]
    fn test_evaluate_training_set() {
        let evaluation = evaluate(&model(), &records());
        assert_eq!(evaluation.total, 6);
        assert_eq!(evaluation.correct, 6);
        assert_relative_eq!(evaluation.accuracy, 1.0);
        assert_eq!(evaluation.fallback_count, 0);
        assert_eq!(evaluation.confusion.classes, vec!["Recommended", "Not Recommended"]);
        assert_eq!(evaluation.confusion.get("Recommended", "Recommended"), 3);
        assert_eq!(evaluation.confusion.get("Recommended", "Not Recommended"), 0);
        assert_eq!(evaluation.outcomes[3].index, 3);
        assert!(evaluation.outcomes[0].explanation.starts_with("Recommended because gpa > "));
    }

    #[test]
    fn test_evaluate_counts_mistakes_and_fallbacks() {
        let model = DecisionTreeModel::train(&records(), &["org"], AttributeSchema::default(), None);
        let probe = vec![
            Record::new("Recommended").with("org", "Maybe"),
            Record::new("Unknown").with("org", "Yes"),
        ];
        let evaluation = evaluate(&model, &probe);
        assert_eq!(evaluation.fallback_count, 1);
        assert_eq!(evaluation.correct, 1);
        assert_relative_eq!(evaluation.accuracy, 0.5);
        assert_eq!(evaluation.confusion.get("Unknown", "Recommended"), 1);
    }

    #[test]
    fn test_evaluate_empty_batch() {
        let none: [Record; 0] = [];
        let evaluation = evaluate(&model(), &none);
        assert_eq!(evaluation.total, 0);
        assert_eq!(evaluation.accuracy, 0.0);
        assert!(evaluation.confusion.classes.is_empty());
    }

    #[test]
    fn test_shuffle_is_deterministic_permutation() {
        let a = shuffled_indices(20, 7);
        let b = shuffled_indices(20, 7);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
        assert_ne!(shuffled_indices(20, 8), a);
    }

    #[test]
    fn test_cross_validate_fold_sizes() {
        let cv = cross_validate(&records(), &["gpa", "org"], &AttributeSchema::default(), 3, 42).unwrap();
        assert_eq!(cv.folds.len(), 3);
        for fold in &cv.folds {
            assert_eq!(fold.test_size, 2);
            assert_eq!(fold.train_size, 4);
            assert!((0.0..=1.0).contains(&fold.accuracy));
        }
        assert!(cv.accuracy.min <= cv.accuracy.median && cv.accuracy.median <= cv.accuracy.max);

        let again = cross_validate(&records(), &["gpa", "org"], &AttributeSchema::default(), 3, 42).unwrap();
        let accuracies: Vec<f64> = cv.folds.iter().map(|f| f.accuracy).collect();
        let repeated: Vec<f64> = again.folds.iter().map(|f| f.accuracy).collect();
        assert_eq!(accuracies, repeated);
    }

    #[test]
    fn test_cross_validate_rejects_bad_fold_counts() {
        let schema = AttributeSchema::default();
        assert!(matches!(cross_validate(&records(), &["gpa"], &schema, 1, 0), Err(EngineError::InvalidConfig(_))));
        assert!(matches!(cross_validate(&records(), &["gpa"], &schema, 7, 0), Err(EngineError::InvalidConfig(_))));
    }
}
