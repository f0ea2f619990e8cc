//! Structured error types shared across rlora crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`AggError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, labels, counts, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the aggregation pipeline.
///
/// The first six families are data-quality signals raised while decoding a
/// single result file; the driver treats them as "skip this file". The
/// remaining families cover the surrounding I/O, serialization and
/// configuration layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum AggError {
    /// File name does not follow the expected structural pattern.
    #[error("filename pattern mismatch: {0}")]
    FilenamePatternMismatch(ErrorInfo),
    /// A required label line is absent from a text summary.
    #[error("missing label: {0}")]
    MissingLabel(ErrorInfo),
    /// A value expected to be numeric could not be parsed.
    #[error("non-numeric value: {0}")]
    NonNumericValue(ErrorInfo),
    /// A derived ratio would divide by zero.
    #[error("zero denominator: {0}")]
    ZeroDenominator(ErrorInfo),
    /// Statistics were requested over an empty sample set.
    #[error("empty sample set: {0}")]
    EmptySampleSet(ErrorInfo),
    /// A JSON document does not have the expected shape.
    #[error("malformed document: {0}")]
    MalformedDocument(ErrorInfo),
    /// Filesystem errors.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Invalid settings or command line overrides.
    #[error("config error: {0}")]
    Config(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl AggError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            AggError::FilenamePatternMismatch(info)
            | AggError::MissingLabel(info)
            | AggError::NonNumericValue(info)
            | AggError::ZeroDenominator(info)
            | AggError::EmptySampleSet(info)
            | AggError::MalformedDocument(info)
            | AggError::Io(info)
            | AggError::Serde(info)
            | AggError::Config(info) => info,
        }
    }

    /// Returns true for per-file data-quality failures that the driver skips.
    pub fn is_data_error(&self) -> bool {
        !matches!(
            self,
            AggError::Io(_) | AggError::Serde(_) | AggError::Config(_)
        )
    }

    /// Attaches a context entry to the payload, preserving the family.
    pub fn with_context(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            AggError::FilenamePatternMismatch(info) => {
                AggError::FilenamePatternMismatch(info.with_context(key, value))
            }
            AggError::MissingLabel(info) => AggError::MissingLabel(info.with_context(key, value)),
            AggError::NonNumericValue(info) => {
                AggError::NonNumericValue(info.with_context(key, value))
            }
            AggError::ZeroDenominator(info) => {
                AggError::ZeroDenominator(info.with_context(key, value))
            }
            AggError::EmptySampleSet(info) => {
                AggError::EmptySampleSet(info.with_context(key, value))
            }
            AggError::MalformedDocument(info) => {
                AggError::MalformedDocument(info.with_context(key, value))
            }
            AggError::Io(info) => AggError::Io(info.with_context(key, value)),
            AggError::Serde(info) => AggError::Serde(info.with_context(key, value)),
            AggError::Config(info) => AggError::Config(info.with_context(key, value)),
        }
    }
}
