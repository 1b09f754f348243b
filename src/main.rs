//! Eligibility tree CLI
//!
//! ```bash
//! # Train on a dataset and save the model
//! eligibility-tree train --data applicants.csv --model-out model.json
//!
//! # Explain one decision
//! eligibility-tree predict --model model.json --record '{"gpa": 3.4, "org": "Yes"}'
//!
//! # Training-set accuracy plus 5-fold cross-validation
//! eligibility-tree evaluate --data applicants.json --folds 5 --outcomes-csv outcomes.csv
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use eligibility_tree::{
    config::DEFAULT_LABEL_FIELD,
    dataset::{Dataset, Record},
    engine,
    error::EngineError,
    evaluate,
    model::{self, DecisionTreeModel},
    results, EngineConfig,
};

#[derive(Parser, Debug)]
#[command(name = "eligibility-tree", version, about = "Train, query and evaluate eligibility decision trees")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a tree and print it
    Train {
        /// Training data (.csv or .json)
        #[arg(long)]
        data: PathBuf,
        /// Engine configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Candidate attributes, overriding the configuration
        #[arg(long, value_delimiter = ',')]
        attributes: Option<Vec<String>>,
        /// Where to save the trained model
        #[arg(long)]
        model_out: Option<PathBuf>,
    },
    /// Predict one record with a saved model
    Predict {
        #[arg(long)]
        model: PathBuf,
        /// Record as a JSON object
        #[arg(long)]
        record: String,
        /// Field ignored as the label if present in the record
        #[arg(long, default_value = DEFAULT_LABEL_FIELD)]
        label_field: String,
    },
    /// Evaluate on the training data and cross-validate
    Evaluate {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of folds, overriding the configuration
        #[arg(long)]
        folds: Option<usize>,
        /// Write per-record training-set outcomes here
        #[arg(long)]
        outcomes_csv: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, EngineError> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    }
}

fn run_train(
    data: &Path,
    config: Option<&Path>,
    attributes: Option<Vec<String>>,
    model_out: Option<&Path>,
) -> Result<(), EngineError> {
    let mut config = load_config(config)?;
    if attributes.is_some() {
        config.attributes = attributes;
        config.validate()?;
    }

    println!("[TRAIN] Loading {:?}", data);
    let dataset = Dataset::load(data, &config.label_field)?;
    println!("[TRAIN] {} records, attributes: {:?}", dataset.len(), model::resolve_attributes(&dataset, &config)?);

    let model = DecisionTreeModel::train_with_config(&dataset, &config)?;
    println!("\n{}", engine::visualize_detailed(&model.root));
    println!("[TRACE]\n{}", engine::format_trace(&model.trace));
    for rule in model.rules() {
        println!("[RULE] {}", rule);
    }

    let stats = &model.stats;
    println!(
        "[RESULT] depth={} nodes={} leaves={} classes={} wall={:.6}s cpu={:.6}s",
        stats.depth,
        stats.node_count,
        stats.leaf_count,
        stats.class_counts,
        stats.timing.wall.as_secs_f64(),
        stats.timing.cpu.as_secs_f64()
    );

    if let Some(path) = model_out {
        model.save(path)?;
        println!("[TRAIN] Model saved to {:?}", path);
    }
    Ok(())
}

fn run_predict(model: &Path, record: &str, label_field: &str) -> Result<(), EngineError> {
    let model = DecisionTreeModel::load(model)?;
    let record = Record::parse_json(record, label_field)?;
    let prediction = model.predict(&record);

    println!("[RESULT] {}", prediction.decision);
    for step in &prediction.path {
        println!("  {}", step);
    }
    println!("{}", prediction.explanation());
    Ok(())
}

fn run_evaluate(
    data: &Path,
    config: Option<&Path>,
    folds: Option<usize>,
    outcomes_csv: Option<&Path>,
) -> Result<(), EngineError> {
    let mut config = load_config(config)?;
    if let Some(folds) = folds {
        config.cv_folds = folds;
        config.validate()?;
    }

    let dataset = Dataset::load(data, &config.label_field)?;
    let attributes = model::resolve_attributes(&dataset, &config)?;
    let model = DecisionTreeModel::train_with_config(&dataset, &config)?;

    let evaluation = evaluate::evaluate(&model, &dataset.records);
    results::print_evaluation(&evaluation);

    let cv = evaluate::cross_validate(&dataset.records, &attributes, &config.schema(), config.cv_folds, config.seed)?;
    results::print_cross_validation(&cv);

    if let Some(path) = outcomes_csv {
        results::write_outcomes_csv(path, &evaluation.outcomes)?;
        println!("[EVAL] Outcomes written to {:?}", path);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Train { data, config, attributes, model_out } => {
            run_train(&data, config.as_deref(), attributes, model_out.as_deref())
        }
        Command::Predict { model, record, label_field } => run_predict(&model, &record, &label_field),
        Command::Evaluate { data, config, folds, outcomes_csv } => {
            run_evaluate(&data, config.as_deref(), folds, outcomes_csv.as_deref())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
