//! Engine configuration: the built-in scholarship attribute schema, the
//! sentinels shared by the builder and predictor, and a JSON-loadable
//! `EngineConfig` for overriding them per deployment.

use std::fmt;
use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// --- Built-in Schema ---
// Attributes treated as continuous unless a config file says otherwise.
// Everything not listed here is categorical.
pub const DEFAULT_CONTINUOUS_ATTRIBUTES: [&str; 2] = ["gpa", "dependents"];
pub const DEFAULT_LABEL_FIELD: &str = "label";

// --- Sentinels ---
/// Decision returned when an unseen value leaves the predictor with no child decisions to vote on.
pub const NOT_RECOMMENDED: &str = "Not Recommended";
/// Class assigned to records whose label field is missing or null.
pub const MISSING_LABEL: &str = "null";
/// Gain ratio reported by a continuous attribute with no usable threshold.
pub const UNUSABLE_GAIN_RATIO: f64 = -1.0;
/// Decimal places used when rendering thresholds into branch labels.
pub const THRESHOLD_DECIMALS: usize = 2;

// --- Evaluation Defaults ---
pub const DEFAULT_CV_FOLDS: usize = 5;
pub const DEFAULT_SEED: u64 = 42;

/// How an attribute is tested at an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Binary `<= threshold` / `> threshold` test.
    Continuous,
    /// One branch per observed value.
    Categorical,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::Continuous => write!(f, "continuous"),
            AttributeKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Fixed lookup table classifying attributes as continuous or categorical.
///
/// The classification is declared up front and never inferred from the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    continuous: FxHashSet<String>,
}

impl AttributeSchema {
    /// Builds a schema where exactly the given attributes are continuous.
    pub fn new<I, S>(continuous: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeSchema {
            continuous: continuous.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn kind(&self, attribute: &str) -> AttributeKind {
        if self.continuous.contains(attribute) {
            AttributeKind::Continuous
        } else {
            AttributeKind::Categorical
        }
    }

    #[inline]
    pub fn is_continuous(&self, attribute: &str) -> bool {
        self.kind(attribute) == AttributeKind::Continuous
    }
}

impl Default for AttributeSchema {
    fn default() -> Self {
        AttributeSchema::new(DEFAULT_CONTINUOUS_ATTRIBUTES)
    }
}

/// Deployment-level settings, loadable from a JSON file.
///
/// Every field is optional in the file; missing fields take the built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Record field holding the ground-truth class.
    pub label_field: String,
    /// Attributes tested with a numeric threshold.
    pub continuous_attributes: Vec<String>,
    /// Candidate attributes for training. `None` means every non-label field.
    pub attributes: Option<Vec<String>>,
    /// Decision for a root call that receives no records.
    pub default_label: Option<String>,
    /// Number of folds used by cross-validation.
    pub cv_folds: usize,
    /// Seed for the cross-validation shuffle.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            label_field: DEFAULT_LABEL_FIELD.to_string(),
            continuous_attributes: DEFAULT_CONTINUOUS_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
            attributes: None,
            default_label: None,
            cv_folds: DEFAULT_CV_FOLDS,
            seed: DEFAULT_SEED,
        }
    }
}

impl EngineConfig {
    /// Loads a configuration from a JSON file and validates it.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON configuration file.
    ///
    /// # Returns
    /// The parsed configuration, or an `EngineError` if the file cannot be read,
    /// is not valid JSON, or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<EngineConfig, EngineError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings that would otherwise fail later in less obvious ways.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.label_field.trim().is_empty() {
            return Err(EngineError::InvalidConfig("label_field must not be empty".into()));
        }
        if self.cv_folds < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "cv_folds must be at least 2 (got {})",
                self.cv_folds
            )));
        }
        if let Some(attributes) = &self.attributes {
            if attributes.iter().any(|a| a == &self.label_field) {
                return Err(EngineError::InvalidConfig(format!(
                    "label field '{}' cannot be a candidate attribute",
                    self.label_field
                )));
            }
        }
        Ok(())
    }

    /// The attribute lookup table described by this configuration.
    pub fn schema(&self) -> AttributeSchema {
        AttributeSchema::new(self.continuous_attributes.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_kinds() {
        let schema = AttributeSchema::default();
        assert_eq!(schema.kind("gpa"), AttributeKind::Continuous);
        assert_eq!(schema.kind("dependents"), AttributeKind::Continuous);
        assert_eq!(schema.kind("org"), AttributeKind::Categorical);
        // Lookup is exact, not case-folded.
        assert_eq!(schema.kind("GPA"), AttributeKind::Categorical);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"label_field": "status"}"#).unwrap();
        assert_eq!(config.label_field, "status");
        assert_eq!(config.cv_folds, DEFAULT_CV_FOLDS);
        assert!(config.schema().is_continuous("gpa"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_label_as_attribute() {
        let config = EngineConfig {
            attributes: Some(vec!["gpa".into(), "label".into()]),
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_single_fold() {
        let config = EngineConfig { cv_folds: 1, ..EngineConfig::default() };
        assert!(config.validate().is_err());
    }
}
