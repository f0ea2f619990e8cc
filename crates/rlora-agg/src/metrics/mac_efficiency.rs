use std::path::Path;

use rlora_core::errors::AggError;

use super::filename::RunFileName;
use super::text::{LabeledText, BYTES_RECEIVED_LABEL};
use super::{malformed, zero_denominator, Metric, MetricKind, ParsedFile, TEXT_SUMMARY_GLOB};
use crate::stat::{compute_stats, StatSummary};

/// Share of received bytes that carried application data.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacEfficiency;

/// `(data bytes, total bytes)` from the `Bytes Received` block.
pub(crate) fn received_bytes(text: &LabeledText) -> Result<(f64, f64), AggError> {
    let values = text.values_after(BYTES_RECEIVED_LABEL)?;
    match values.as_slice() {
        [data, total, ..] => Ok((*data, *total)),
        _ => Err(malformed(
            "rlora_agg.bytes_received",
            "expected two values after 'Bytes Received'",
        )),
    }
}

impl Metric for MacEfficiency {
    type Sample = f64;
    type Summary = StatSummary;

    fn kind(&self) -> MetricKind {
        MetricKind::MacEfficiency
    }

    fn patterns(&self) -> &'static [&'static str] {
        &[TEXT_SUMMARY_GLOB]
    }

    fn parse(&self, path: &Path) -> Result<ParsedFile<f64>, AggError> {
        let name = RunFileName::from_path(path)?;
        let (data, total) = received_bytes(&LabeledText::read(path)?)?;
        if total == 0.0 {
            return Err(zero_denominator(
                "rlora_agg.mac_efficiency_total",
                "total received bytes is zero",
            ));
        }
        Ok(ParsedFile {
            metadata: name.metadata(),
            sample: data / total,
        })
    }

    fn summarize(&self, samples: &[f64]) -> Result<StatSummary, AggError> {
        compute_stats(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_block_is_malformed() {
        let text = LabeledText::parse("Bytes Received\n800\nEnd\n");
        assert!(matches!(
            received_bytes(&text),
            Err(AggError::MalformedDocument(_))
        ));
        let text = LabeledText::parse("Bytes Received\n800\n1000\n");
        assert_eq!(received_bytes(&text).unwrap(), (800.0, 1000.0));
    }
}
