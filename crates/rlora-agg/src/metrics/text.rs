//! Label-delimited plain-text run summaries.

use std::fs;
use std::path::Path;

use rlora_core::errors::{AggError, ErrorInfo};

use super::io_error;

/// Label preceding the collision count.
pub const COLLISIONS_LABEL: &str = "Collisions";
/// Label preceding the data and total received byte counts.
pub const BYTES_RECEIVED_LABEL: &str = "Bytes Received";

/// A text summary reduced to its non-blank, trimmed lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledText {
    lines: Vec<String>,
}

impl LabeledText {
    /// Splits file contents into trimmed non-blank lines.
    pub fn parse(contents: &str) -> Self {
        let lines = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { lines }
    }

    /// Reads and splits a file.
    pub fn read(path: &Path) -> Result<Self, AggError> {
        let contents = fs::read_to_string(path).map_err(|err| io_error("text_read", path, err))?;
        Ok(Self::parse(&contents))
    }

    /// Consecutive numeric lines directly after the first exact `label` line.
    pub fn values_after(&self, label: &str) -> Result<Vec<f64>, AggError> {
        let index = self
            .lines
            .iter()
            .position(|line| line == label)
            .ok_or_else(|| {
                AggError::MissingLabel(
                    ErrorInfo::new("rlora_agg.label_missing", format!("label '{label}' missing"))
                        .with_context("label", label),
                )
            })?;
        let values: Vec<f64> = self.lines[index + 1..]
            .iter()
            .map_while(|line| line.parse::<f64>().ok())
            .collect();
        if values.is_empty() {
            return Err(AggError::NonNumericValue(
                ErrorInfo::new(
                    "rlora_agg.label_values",
                    format!("no numeric values after label '{label}'"),
                )
                .with_context("label", label),
            ));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Summary\n\n  Collisions \n12\nBytes Received\n800\n1000\nDone\n3\n";

    #[test]
    fn reads_values_until_first_non_numeric_line() {
        let text = LabeledText::parse(SAMPLE);
        assert_eq!(text.values_after(COLLISIONS_LABEL).unwrap(), vec![12.0]);
        assert_eq!(
            text.values_after(BYTES_RECEIVED_LABEL).unwrap(),
            vec![800.0, 1000.0]
        );
    }

    #[test]
    fn missing_label_and_missing_values_are_distinct() {
        let text = LabeledText::parse("Collisions\nnone\n");
        assert!(matches!(
            text.values_after(BYTES_RECEIVED_LABEL),
            Err(AggError::MissingLabel(_))
        ));
        assert!(matches!(
            text.values_after(COLLISIONS_LABEL),
            Err(AggError::NonNumericValue(_))
        ));
    }

    #[test]
    fn label_must_match_the_whole_line() {
        let text = LabeledText::parse("Total Collisions\n4\n");
        assert!(matches!(
            text.values_after(COLLISIONS_LABEL),
            Err(AggError::MissingLabel(_))
        ));
    }
}
