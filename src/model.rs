//! Trained models and the handle a host service keeps them in.
//!
//! A `DecisionTreeModel` bundles a tree with what it was trained on. The
//! `ModelHandle` holds at most one model at a time and swaps it wholesale on
//! retraining; readers keep the `Arc` they were given, so a prediction in
//! flight never observes a half-replaced tree.

use std::borrow::Borrow;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::{Arc, RwLock};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{AttributeSchema, EngineConfig};
use crate::cpu_time::{Stopwatch, Timing};
use crate::dataset::{Dataset, Record};
use crate::engine::{self, Prediction, TraceEntry};
use crate::error::EngineError;
use crate::tree::{ClassCounts, DecisionRule, TreeNode};

/// Shape and cost of a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub samples: usize,
    pub class_counts: ClassCounts,
    pub depth: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    pub timing: Timing,
}

/// A trained tree plus the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeModel {
    pub root: TreeNode,
    /// Candidate attributes, in the order they were offered to the builder.
    pub attributes: Vec<String>,
    pub schema: AttributeSchema,
    /// Attribute searches performed while training.
    #[serde(default)]
    pub trace: Vec<TraceEntry>,
    pub stats: TrainingStats,
}

impl DecisionTreeModel {
    /// Trains a model on `records`.
    ///
    /// # Arguments
    /// * `records` - Training records; never modified.
    /// * `attributes` - Candidate attributes, in tie-break priority order.
    /// * `schema` - Lookup table deciding which attributes are continuous.
    /// * `default_label` - Decision when there are no records.
    pub fn train<R: Borrow<Record>, S: AsRef<str>>(
        records: &[R],
        attributes: &[S],
        schema: AttributeSchema,
        default_label: Option<&str>,
    ) -> DecisionTreeModel {
        let stopwatch = Stopwatch::start();
        let mut trace = Vec::new();
        let root = engine::build_tree(records, attributes, &schema, default_label, &mut trace);
        let timing = stopwatch.elapsed();

        let stats = TrainingStats {
            samples: records.len(),
            class_counts: ClassCounts::from_records(records),
            depth: root.depth(),
            node_count: root.node_count(),
            leaf_count: root.leaf_count(),
            timing,
        };
        info!(
            "Trained on {} records: depth {}, {} nodes, {} leaves in {:.3}s",
            stats.samples, stats.depth, stats.node_count, stats.leaf_count, timing.wall.as_secs_f64()
        );

        DecisionTreeModel {
            root,
            attributes: attributes.iter().map(|a| a.as_ref().to_string()).collect(),
            schema,
            trace,
            stats,
        }
    }

    /// Trains on a loaded dataset using the attribute list and schema from `config`.
    pub fn train_with_config(dataset: &Dataset, config: &EngineConfig) -> Result<DecisionTreeModel, EngineError> {
        let attributes = resolve_attributes(dataset, config)?;
        Ok(DecisionTreeModel::train(
            &dataset.records,
            &attributes,
            config.schema(),
            config.default_label.as_deref(),
        ))
    }

    pub fn predict(&self, record: &Record) -> Prediction {
        engine::predict(&self.root, record)
    }

    pub fn visualize(&self) -> String {
        engine::visualize(&self.root)
    }

    pub fn rules(&self) -> Vec<DecisionRule> {
        self.root.decision_paths()
    }

    /// Writes the model as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EngineError> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Reads a model written by `save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DecisionTreeModel, EngineError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Candidate attributes for training: the configured list if any, otherwise
/// every attribute the dataset exposes (minus the label).
///
/// Configured attributes missing from the dataset are kept, with a warning;
/// every record then reads them as null.
pub fn resolve_attributes(dataset: &Dataset, config: &EngineConfig) -> Result<Vec<String>, EngineError> {
    let attributes: Vec<String> = match &config.attributes {
        Some(configured) => {
            for attribute in configured {
                if !dataset.attribute_names().contains(attribute) {
                    warn!("Configured attribute '{}' does not appear in the dataset", attribute);
                }
            }
            configured.clone()
        }
        None => dataset
            .attribute_names()
            .iter()
            .filter(|a| **a != config.label_field)
            .cloned()
            .collect(),
    };

    if attributes.is_empty() {
        return Err(EngineError::EmptyAttributeList);
    }
    Ok(attributes)
}

/// Service-owned slot holding the current model.
#[derive(Debug, Default)]
pub struct ModelHandle {
    current: RwLock<Option<Arc<DecisionTreeModel>>>,
}

impl ModelHandle {
    pub fn new() -> Self {
        ModelHandle::default()
    }

    /// Installs `model`, returning the one it replaces.
    pub fn replace(&self, model: DecisionTreeModel) -> Option<Arc<DecisionTreeModel>> {
        self.install(Arc::new(model))
    }

    fn install(&self, model: Arc<DecisionTreeModel>) -> Option<Arc<DecisionTreeModel>> {
        // The slot only ever holds a complete Arc, so a poisoned lock is still consistent.
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        slot.replace(model)
    }

    /// Trains a new model and installs it. Training happens outside the lock.
    pub fn retrain<R: Borrow<Record>, S: AsRef<str>>(
        &self,
        records: &[R],
        attributes: &[S],
        schema: AttributeSchema,
        default_label: Option<&str>,
    ) -> Arc<DecisionTreeModel> {
        let model = Arc::new(DecisionTreeModel::train(records, attributes, schema, default_label));
        self.install(Arc::clone(&model));
        model
    }

    /// The current model, or `EngineError::NotTrained`.
    pub fn current(&self) -> Result<Arc<DecisionTreeModel>, EngineError> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(EngineError::NotTrained)
    }

    pub fn is_trained(&self) -> bool {
        self.current().is_ok()
    }

    pub fn predict(&self, record: &Record) -> Result<Prediction, EngineError> {
        Ok(self.current()?.predict(record))
    }

    pub fn visualize(&self) -> Result<String, EngineError> {
        Ok(self.current()?.visualize())
    }
}
