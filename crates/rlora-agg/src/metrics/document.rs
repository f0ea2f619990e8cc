//! JSON vector exports in their raw and flattened encodings.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use rlora_core::errors::{AggError, ErrorInfo};
use rlora_core::{normalize_metadata, ExperimentMetadata};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{io_error, malformed};

/// One named, time-tagged event vector recorded by a simulation module.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawVector {
    /// Recording module path, e.g. `Net.loRaNodes[3].app`.
    #[serde(default)]
    pub module: String,
    /// Vector name, e.g. `receivedMissionId:vector`.
    #[serde(default)]
    pub name: String,
    /// Event timestamps in seconds.
    #[serde(default)]
    pub time: Vec<f64>,
    /// Event values.
    #[serde(default)]
    pub value: Vec<f64>,
}

/// A decoded result document.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultDocument {
    /// `{"metadata": {...}, "results": <reduced value>}`.
    Flattened {
        /// Iteration variables with quotes still in place.
        metadata: BTreeMap<String, String>,
        /// Reduction written by the flatten step.
        results: Value,
    },
    /// `{"<run>": {"itervars": {...}, "vectors": [...]}}`.
    Raw {
        /// Run key the export was stored under.
        run: String,
        /// Iteration variables with quotes still in place.
        itervars: BTreeMap<String, String>,
        /// Recorded vectors.
        vectors: Vec<RawVector>,
    },
}

impl ResultDocument {
    /// Reads and decodes a document.
    pub fn read(path: &Path) -> Result<Self, AggError> {
        let bytes = fs::read(path).map_err(|err| io_error("document_read", path, err))?;
        Self::from_slice(&bytes).map_err(|err| err.with_context("path", path.display().to_string()))
    }

    /// Decodes a document from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AggError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|err| malformed("rlora_agg.document_json", err.to_string()))?;
        Self::from_value(value)
    }

    /// Classifies an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, AggError> {
        let Value::Object(mut top) = value else {
            return Err(malformed(
                "rlora_agg.document_shape",
                "top-level JSON value is not an object",
            ));
        };

        if is_flattened(&top) {
            let metadata = top
                .remove("metadata")
                .map(string_map)
                .transpose()?
                .unwrap_or_default();
            let results = top.remove("results").unwrap_or(Value::Null);
            return Ok(ResultDocument::Flattened { metadata, results });
        }

        let Some((run, experiment)) = top.into_iter().next() else {
            return Err(malformed("rlora_agg.document_empty", "document has no run entry"));
        };
        let Value::Object(mut experiment) = experiment else {
            return Err(malformed(
                "rlora_agg.document_shape",
                format!("run entry '{run}' is not an object"),
            ));
        };
        let itervars = experiment
            .remove("itervars")
            .map(string_map)
            .transpose()?
            .unwrap_or_default();
        let vectors = match experiment.remove("vectors") {
            None | Some(Value::Null) => Vec::new(),
            Some(vectors) => serde_json::from_value(vectors)
                .map_err(|err| malformed("rlora_agg.document_vectors", err.to_string()))?,
        };
        Ok(ResultDocument::Raw {
            run,
            itervars,
            vectors,
        })
    }

    /// Iteration variables as stored in the document.
    pub fn raw_metadata(&self) -> &BTreeMap<String, String> {
        match self {
            ResultDocument::Flattened { metadata, .. } => metadata,
            ResultDocument::Raw { itervars, .. } => itervars,
        }
    }

    /// Normalized grouping metadata.
    pub fn metadata(&self) -> Result<ExperimentMetadata, AggError> {
        normalize_metadata(self.raw_metadata())
    }

    /// Returns true for documents already reduced by the flatten step.
    pub fn is_flattened(&self) -> bool {
        matches!(self, ResultDocument::Flattened { .. })
    }
}

fn is_flattened(top: &Map<String, Value>) -> bool {
    top.len() == 2 && top.contains_key("metadata") && top.contains_key("results")
}

fn string_map(value: Value) -> Result<BTreeMap<String, String>, AggError> {
    let Value::Object(map) = value else {
        return Err(malformed(
            "rlora_agg.document_itervars",
            "iteration variables are not an object",
        ));
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

/// Node index embedded in a module path such as `Net.loRaNodes[12].mac`.
pub fn node_index(module: &str) -> Option<usize> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"[lL]o[Rr]aNodes\[(\d+)\]").expect("node module pattern is valid")
    });
    pattern
        .captures(module)
        .and_then(|caps| caps[1].parse().ok())
}

/// Reduces a flattened payload to one number, averaging small lists.
///
/// Accepts a bare number, a list of numbers, or a list of `{"value": [...]}`
/// records.
pub fn extract_scalar(value: &Value) -> Result<f64, AggError> {
    if let Some(number) = value.as_f64() {
        return Ok(number);
    }
    let mut numbers = Vec::new();
    if let Value::Array(items) = value {
        for item in items {
            if let Some(number) = item.as_f64() {
                numbers.push(number);
            } else if let Some(Value::Array(values)) = item.get("value") {
                numbers.extend(values.iter().filter_map(Value::as_f64));
            }
        }
    }
    if numbers.is_empty() {
        return Err(AggError::NonNumericValue(ErrorInfo::new(
            "rlora_agg.scalar_missing",
            "stored result is not numeric",
        )));
    }
    Ok(numbers.iter().sum::<f64>() / numbers.len() as f64)
}
