//! Errors raised by the host-facing layer: loading data and configuration,
//! persisting models, and querying a model handle before training.
//!
//! The engine functions themselves (`gain`, `builder`, `predict`, `visualize`)
//! never fail; degenerate inputs are resolved by policy.

use std::io;

/// Errors surfaced by dataset loading, model persistence and the model handle.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("no model has been trained yet")]
    NotTrained,

    #[error("candidate attribute list is empty")]
    EmptyAttributeList,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
