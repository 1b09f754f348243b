use std::{fs::File, path::Path};

use csv::WriterBuilder;

use crate::{
    error::EngineError,
    evaluate::{CrossValidation, Evaluation, Outcome},
};

/// Prints accuracy and the confusion counts of a batch evaluation to the console.
pub fn print_evaluation(evaluation: &Evaluation) {
    println!("\n======== EVALUATION ========");
    println!(
        "Accuracy: {:.3} ({} / {}), fallback predictions: {}",
        evaluation.accuracy, evaluation.correct, evaluation.total, evaluation.fallback_count
    );

    let confusion = &evaluation.confusion;
    if confusion.classes.is_empty() {
        return;
    }
    let width = confusion.classes.iter().map(|c| c.len()).max().unwrap_or(0).max(6);
    print!("{:<width$} |", "actual", width = width);
    for class in &confusion.classes {
        print!(" {:>width$}", class, width = width);
    }
    println!();
    println!("{}", "-".repeat((width + 1) * (confusion.classes.len() + 1) + 1));
    for (class, row) in confusion.classes.iter().zip(&confusion.counts) {
        print!("{:<width$} |", class, width = width);
        for count in row {
            print!(" {:>width$}", count, width = width);
        }
        println!();
    }
}

/// Prints one row per fold followed by the accuracy and training time summaries.
pub fn print_cross_validation(cv: &CrossValidation) {
    println!("\n======== CROSS-VALIDATION ({} folds, seed {}) ========", cv.folds.len(), cv.seed);
    println!("Fold | Train | Test | Accuracy | Fallbacks | Depth | Nodes | Train Time (s)");
    println!("-----|-------|------|----------|-----------|-------|-------|---------------");
    for fold in &cv.folds {
        println!(
            "{:>4} | {:>5} | {:>4} | {:>8.3} | {:>9} | {:>5} | {:>5} | {:>14.6}",
            fold.fold,
            fold.train_size,
            fold.test_size,
            fold.accuracy,
            fold.fallback_count,
            fold.depth,
            fold.node_count,
            fold.train_time.as_secs_f64()
        );
    }
    let a = &cv.accuracy;
    let t = &cv.train_time;
    println!(
        "[RESULT] Accuracy: min={:.3} med={:.3} max={:.3} mean={:.3} std={:.3}",
        a.min, a.median, a.max, a.mean, a.std_dev
    );
    println!(
        "[RESULT] Train time: min={:.6}s med={:.6}s max={:.6}s mean={:.6}s std={:.6}s",
        t.min, t.median, t.max, t.mean, t.std_dev
    );
}

/// Writes per-record outcomes to a CSV file, header row included. Creates or truncates the file.
pub fn write_outcomes_csv<P: AsRef<Path>>(path: P, outcomes: &[Outcome]) -> Result<(), EngineError> {
    let file = File::create(path.as_ref())?;
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(file);
    for outcome in outcomes {
        wtr.serialize(outcome)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_outcomes_csv() {
        let outcomes = vec![
            Outcome {
                index: 0,
                actual: "A".into(),
                predicted: "A".into(),
                correct: true,
                fallback: false,
                explanation: "A because gpa > 2.90".into(),
            },
            Outcome {
                index: 1,
                actual: "B".into(),
                predicted: "A".into(),
                correct: false,
                fallback: true,
                explanation: "A by majority of known branches: org = X was not seen in training".into(),
            },
        ];
        let file = tempfile::NamedTempFile::new().unwrap();
        write_outcomes_csv(file.path(), &outcomes).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("index,actual,predicted,correct,fallback,explanation"));
        assert_eq!(lines.next(), Some("0,A,A,true,false,A because gpa > 2.90"));
        assert_eq!(lines.next(), Some("1,B,A,false,true,A by majority of known branches: org = X was not seen in training"));
    }
}
