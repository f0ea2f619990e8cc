use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use rlora_core::errors::{AggError, ErrorInfo};
use rlora_core::ExperimentMetadata;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::catalog::Partition;
use crate::serde::to_canonical_json_pretty;

fn report_error(code: &str, path: &Path, err: impl ToString) -> AggError {
    AggError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// One aggregated group inside a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry<S> {
    /// Group metadata without protocol and dimension.
    pub metadata: ExperimentMetadata,
    /// Metric-specific summary.
    pub data: S,
}

/// Header of a report document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Protocol, lowercased.
    pub protocol: String,
    /// Dimension label of the partition.
    pub dimensions: String,
    /// Number of entries.
    pub count: usize,
}

/// A full per-(protocol, dimension, metric) report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument<S> {
    /// Document header.
    pub metadata: DocumentMeta,
    /// Entries in group key order.
    pub data: Vec<ReportEntry<S>>,
}

#[derive(Serialize)]
struct DocumentRef<'a, S> {
    metadata: DocumentMeta,
    data: &'a [ReportEntry<S>],
}

/// Replaces each run of characters outside `[A-Za-z0-9_.-]` with one `-`.
pub fn sanitize_dimension(dimension: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE
        .get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("sanitize pattern is valid"))
        .replace_all(dimension, "-")
        .into_owned()
}

/// Writes report documents below an output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWriter {
    output_root: PathBuf,
}

impl ReportWriter {
    /// Creates a writer rooted at `output_root`.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// `<root>/<kind>/<protocol lowercased>_<dimension sanitized>_<kind>.json`.
    pub fn report_path(&self, partition: &Partition, kind_dir: &str) -> PathBuf {
        let file_name = format!(
            "{}_{}_{}.json",
            partition.protocol.to_lowercase(),
            sanitize_dimension(&partition.dimension),
            kind_dir
        );
        self.output_root.join(kind_dir).join(file_name)
    }

    /// Serializes the entries and atomically replaces the partition's report.
    pub fn write<S: Serialize>(
        &self,
        partition: &Partition,
        kind_dir: &str,
        entries: &[ReportEntry<S>],
    ) -> Result<PathBuf, AggError> {
        let document = DocumentRef {
            metadata: DocumentMeta {
                protocol: partition.protocol.to_lowercase(),
                dimensions: partition.dimension.clone(),
                count: entries.len(),
            },
            data: entries,
        };
        let bytes = to_canonical_json_pretty(&document)?;
        let path = self.report_path(partition, kind_dir);
        write_atomic(&path, &bytes)?;
        info!(path = %path.display(), entries = entries.len(), "wrote report");
        Ok(path)
    }
}

/// Replaces `path` with `bytes` through a temporary sibling file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AggError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|err| report_error("report_dir", dir, err))?;
    let mut file = NamedTempFile::new_in(dir).map_err(|err| report_error("report_temp", dir, err))?;
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .map_err(|err| report_error("report_write", path, err))?;
    file.persist(path)
        .map_err(|err| report_error("report_persist", path, err.error))?;
    Ok(())
}
