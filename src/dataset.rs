//! Applicant records and the loaders that read them from JSON or CSV.
//!
//! This module does not have performance critical code. Validation is allowed!

use std::fmt;
use std::fs::{self, File};
use std::path::Path;

use csv::ReaderBuilder;
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::MISSING_LABEL;
use crate::error::EngineError;

/// A single attribute value as supplied by the host service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

static NULL_VALUE: Value = Value::Null;

impl Value {
    /// Numeric reading used by continuous tests.
    ///
    /// Booleans read as 1/0 and numeric text is parsed; `Null`, NaN and
    /// non-numeric text have no numeric reading.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::Number(_) => None,
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
            Value::Null => None,
        }
    }

    /// Key under which this value is routed at a categorical node.
    pub fn branch_key(&self) -> String {
        self.to_string()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts a JSON scalar. Arrays and objects have no attribute reading.
    fn from_json(value: &JsonValue) -> Option<Value> {
        match value {
            JsonValue::Null => Some(Value::Null),
            JsonValue::Bool(b) => Some(Value::Bool(*b)),
            JsonValue::Number(n) => n.as_f64().map(Value::Number),
            JsonValue::String(s) => Some(Value::Text(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    /// Reads a CSV cell: empty is `Null`, `true`/`false` are booleans,
    /// anything numeric is a number and the rest is text.
    fn from_cell(cell: &str) -> Value {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            // Integral numbers print without a trailing ".0" so that 2 and "2" share a branch.
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// An applicant record: attribute values plus the ground-truth class.
///
/// Records are never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub attributes: FxHashMap<String, Value>,
    pub label: String,
}

impl Record {
    pub fn new(label: impl Into<String>) -> Self {
        Record { attributes: FxHashMap::default(), label: label.into() }
    }

    /// A record whose class is unknown, as submitted for prediction.
    pub fn unlabeled() -> Self {
        Record::new(MISSING_LABEL)
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }

    /// Value of `attribute`, or `Null` when the record does not carry it.
    #[inline]
    pub fn get(&self, attribute: &str) -> &Value {
        self.attributes.get(attribute).unwrap_or(&NULL_VALUE)
    }

    /// Builds a record from a flat JSON object.
    ///
    /// The label field is removed from the attributes. A missing or null label
    /// becomes the implicit `MISSING_LABEL` class; numbers and booleans are
    /// stringified.
    ///
    /// # Arguments
    /// * `object` - The JSON object for one record.
    /// * `label_field` - Name of the field holding the class.
    /// * `index` - Position of the record in its source, used in error messages.
    pub fn from_json_object(
        object: &serde_json::Map<String, JsonValue>,
        label_field: &str,
        index: usize,
    ) -> Result<Record, EngineError> {
        let mut record = Record::new(MISSING_LABEL);
        for (key, raw) in object {
            if key == label_field {
                record.label = match raw {
                    JsonValue::Null => MISSING_LABEL.to_string(),
                    JsonValue::String(s) => s.clone(),
                    JsonValue::Bool(b) => b.to_string(),
                    JsonValue::Number(_) => Value::from_json(raw).map(|v| v.to_string()).unwrap_or_default(),
                    JsonValue::Array(_) | JsonValue::Object(_) => {
                        return Err(EngineError::InvalidRecord {
                            index,
                            reason: format!("label field '{}' must be a scalar", label_field),
                        })
                    }
                };
                continue;
            }
            let value = Value::from_json(raw).ok_or_else(|| EngineError::InvalidRecord {
                index,
                reason: format!("attribute '{}' must be a scalar", key),
            })?;
            record.attributes.insert(key.clone(), value);
        }
        Ok(record)
    }

    /// Parses a single JSON object, e.g. a record submitted for prediction.
    pub fn parse_json(text: &str, label_field: &str) -> Result<Record, EngineError> {
        let parsed: JsonValue = serde_json::from_str(text)?;
        match parsed {
            JsonValue::Object(object) => Record::from_json_object(&object, label_field, 0),
            _ => Err(EngineError::InvalidRecord { index: 0, reason: "expected a JSON object".into() }),
        }
    }
}

/// A loaded set of labeled records together with the attribute names they expose.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<Record>,
    attribute_names: Vec<String>,
}

impl Dataset {
    /// Wraps records already in memory. Attribute names are collected in
    /// first-seen order, sorted within each record for determinism.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut attribute_names = Vec::new();
        for record in &records {
            let mut keys: Vec<&String> = record.attributes.keys().collect();
            keys.sort();
            for key in keys {
                if seen.insert(key.clone()) {
                    attribute_names.push(key.clone());
                }
            }
        }
        Dataset { records, attribute_names }
    }

    fn with_columns(records: Vec<Record>, attribute_names: Vec<String>) -> Self {
        Dataset { records, attribute_names }
    }

    /// Attribute names excluding the label, in first-seen order.
    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loads a JSON array of flat objects.
    ///
    /// Attribute order follows the keys of the first object carrying each key,
    /// as written in the file.
    ///
    /// # Arguments
    /// * `path` - The JSON file to read.
    /// * `label_field` - Name of the field holding the class.
    pub fn load_json<P: AsRef<Path>>(path: P, label_field: &str) -> Result<Dataset, EngineError> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref)?;
        let parsed: JsonValue = serde_json::from_str(&content)?;
        let rows = match parsed {
            JsonValue::Array(rows) => rows,
            _ => {
                return Err(EngineError::InvalidRecord {
                    index: 0,
                    reason: format!("{:?} must contain a JSON array of records", path_ref),
                })
            }
        };

        let mut records = Vec::with_capacity(rows.len());
        let mut attribute_names = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut missing_labels = 0usize;

        for (index, row) in rows.iter().enumerate() {
            let object = row.as_object().ok_or_else(|| EngineError::InvalidRecord {
                index,
                reason: "expected a JSON object".into(),
            })?;
            for key in object.keys() {
                if key != label_field && seen.insert(key.clone()) {
                    attribute_names.push(key.clone());
                }
            }
            if object.get(label_field).map_or(true, JsonValue::is_null) {
                missing_labels += 1;
            }
            records.push(Record::from_json_object(object, label_field, index)?);
        }

        if missing_labels > 0 {
            warn!(
                "{} of {} records in {:?} have no '{}' value; counted as class '{}'",
                missing_labels, records.len(), path_ref, label_field, MISSING_LABEL
            );
        }
        debug!("Loaded {} records with {} attributes from {:?}", records.len(), attribute_names.len(), path_ref);
        Ok(Dataset::with_columns(records, attribute_names))
    }

    /// Loads a CSV file with a header row; the label column must be present.
    ///
    /// # Arguments
    /// * `path` - The CSV file to read.
    /// * `label_field` - Header of the column holding the class.
    pub fn load_csv<P: AsRef<Path>>(path: P, label_field: &str) -> Result<Dataset, EngineError> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)?;
        let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(file);
        let headers = rdr.headers()?.clone();
        let label_index = headers
            .iter()
            .position(|h| h == label_field)
            .ok_or_else(|| EngineError::MissingColumn(label_field.to_string()))?;

        let attribute_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != label_index)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut records = Vec::new();
        let mut missing_labels = 0usize;
        for (row_idx, result) in rdr.records().enumerate() {
            let row = result?;
            let mut record = Record::new(MISSING_LABEL);
            for (col_idx, cell) in row.iter().enumerate() {
                let header = headers.get(col_idx).ok_or_else(|| EngineError::InvalidRecord {
                    index: row_idx,
                    reason: format!("row has more cells than the header ({})", headers.len()),
                })?;
                if col_idx == label_index {
                    if cell.trim().is_empty() {
                        missing_labels += 1;
                    } else {
                        record.label = cell.trim().to_string();
                    }
                } else {
                    record.attributes.insert(header.to_string(), Value::from_cell(cell));
                }
            }
            records.push(record);
        }

        if missing_labels > 0 {
            warn!(
                "{} of {} rows in {:?} have an empty '{}' cell; counted as class '{}'",
                missing_labels, records.len(), path_ref, label_field, MISSING_LABEL
            );
        }
        debug!("Loaded {} rows with {} attributes from {:?}", records.len(), attribute_names.len(), path_ref);
        Ok(Dataset::with_columns(records, attribute_names))
    }

    /// Picks the loader from the file extension (`.csv`, otherwise JSON).
    pub fn load<P: AsRef<Path>>(path: P, label_field: &str) -> Result<Dataset, EngineError> {
        let is_csv = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
        if is_csv {
            Dataset::load_csv(path, label_field)
        } else {
            Dataset::load_json(path, label_field)
        }
    }
}
