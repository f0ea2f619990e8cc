use std::fs;
use std::path::Path;

use rlora_core::errors::{AggError, ErrorInfo};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::catalog::{files_under, NamePattern};
use crate::metrics::document::{RawVector, ResultDocument};
use crate::metrics::propagation::propagation_run;
use crate::metrics::reception::reception_ratios;
use crate::metrics::time_on_air::fairness_of;
use crate::report::write_atomic;
use crate::serde::to_canonical_json_pretty;
use crate::stat::RunStats;

const TIME_ON_AIR_GLOB: &str = "timeOnAir-*.json";
const ID_RECEIVED_GLOB: &str = "idReceived-*.json";
const MISSION_ID_GLOB: &str = "missionId-*.json";

/// Raw export families that can be reduced in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// `timeOnAir-*.json`, reduced to a fairness scalar.
    TimeOnAir,
    /// `idReceived-*.json`, reduced to per-run reception statistics.
    IdReceived,
    /// `missionId-*.json`, reduced to per-run propagation statistics.
    MissionId,
}

impl ExportKind {
    /// Classifies a file name by its prefix.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if !name.ends_with(".json") {
            return None;
        }
        if name.starts_with("timeOnAir-") {
            Some(ExportKind::TimeOnAir)
        } else if name.starts_with("idReceived-") {
            Some(ExportKind::IdReceived)
        } else if name.starts_with("missionId-") {
            Some(ExportKind::MissionId)
        } else {
            None
        }
    }

    /// Reduced `results` payload; `[]` when the export holds nothing to reduce.
    pub fn reduce(self, vectors: &[RawVector]) -> Value {
        match self {
            ExportKind::TimeOnAir => fairness_of(vectors).map_or_else(|| json!([]), |v| json!(v)),
            ExportKind::IdReceived => {
                let ratios = reception_ratios(vectors);
                if ratios.is_empty() {
                    json!([])
                } else {
                    to_value(&RunStats::from_values(&ratios))
                }
            }
            ExportKind::MissionId => {
                propagation_run(vectors).map_or_else(|| json!([]), |run| to_value(&run))
            }
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Counters of one flatten pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FlattenOutcome {
    /// Raw exports rewritten.
    pub rewritten: usize,
    /// Files already in flattened form.
    pub already_flat: usize,
    /// Files that could not be read or decoded.
    pub failed: usize,
}

/// Iteration variables of the first run entry, string values unquoted and
/// everything else kept as stored.
fn cleaned_itervars(top: &Value) -> Map<String, Value> {
    top.as_object()
        .and_then(|runs| runs.values().next())
        .and_then(|run| run.get("itervars"))
        .and_then(Value::as_object)
        .map(|itervars| {
            itervars
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(text) => Value::String(text.trim_matches('"').to_string()),
                        other => other.clone(),
                    };
                    (key.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Rewrites one raw export in place; returns false when it was already flat.
pub fn flatten_file(path: &Path, kind: ExportKind) -> Result<bool, AggError> {
    let bytes = fs::read(path).map_err(|err| {
        AggError::Io(
            ErrorInfo::new("flatten_read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    let top: Value = serde_json::from_slice(&bytes).map_err(|err| {
        AggError::MalformedDocument(
            ErrorInfo::new("rlora_agg.document_json", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    let metadata = cleaned_itervars(&top);
    let ResultDocument::Raw { vectors, .. } = ResultDocument::from_value(top)? else {
        return Ok(false);
    };
    let flattened = json!({
        "metadata": metadata,
        "results": kind.reduce(&vectors),
    });
    write_atomic(path, &to_canonical_json_pretty(&flattened)?)?;
    Ok(true)
}

/// Reduces every raw time-on-air, reception and mission export below `root`.
///
/// Already flattened files are left untouched, so running twice is harmless.
pub fn flatten(root: &Path) -> Result<FlattenOutcome, AggError> {
    let pattern = NamePattern::new(&[TIME_ON_AIR_GLOB, ID_RECEIVED_GLOB, MISSION_ID_GLOB])?;
    let mut outcome = FlattenOutcome::default();
    info!(root = %root.display(), "flattening raw exports");
    if !root.is_dir() {
        warn!(root = %root.display(), "data root missing");
        return Ok(outcome);
    }

    for path in files_under(root, &pattern) {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(kind) = ExportKind::from_file_name(&name) else {
            continue;
        };
        match flatten_file(&path, kind) {
            Ok(true) => {
                debug!(path = %path.display(), "flattened");
                outcome.rewritten += 1;
            }
            Ok(false) => {
                debug!(path = %path.display(), "already flattened, skipping");
                outcome.already_flat += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to flatten");
                outcome.failed += 1;
            }
        }
    }

    info!(
        rewritten = outcome.rewritten,
        already_flat = outcome.already_flat,
        failed = outcome.failed,
        "flatten finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_kinds_follow_prefixes() {
        assert_eq!(
            ExportKind::from_file_name("timeOnAir-run1.json"),
            Some(ExportKind::TimeOnAir)
        );
        assert_eq!(
            ExportKind::from_file_name("missionId-run1.json"),
            Some(ExportKind::MissionId)
        );
        assert_eq!(ExportKind::from_file_name("idReceived-run1.txt"), None);
        assert_eq!(ExportKind::from_file_name("throughput-run1.json"), None);
    }

    #[test]
    fn itervars_keep_numbers_and_lose_quotes() {
        let top = json!({
            "General-0": {
                "itervars": {"numberNodes": 10, "ttnm": "\"4s\"", "mobility": "Static"},
                "vectors": []
            }
        });
        let metadata = cleaned_itervars(&top);
        assert_eq!(metadata["numberNodes"], json!(10));
        assert_eq!(metadata["ttnm"], json!("4s"));
        assert_eq!(metadata["mobility"], json!("Static"));
    }

    #[test]
    fn empty_exports_reduce_to_empty_lists() {
        for kind in [ExportKind::TimeOnAir, ExportKind::IdReceived, ExportKind::MissionId] {
            assert_eq!(kind.reduce(&[]), json!([]));
        }
    }
}
