//! Experiment metadata and its canonical grouping form.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{AggError, ErrorInfo};

/// Iteration variable naming the node movement pattern; never part of a group key.
pub const MOBILITY: &str = "mobility";
/// Raw area width variable.
pub const MAX_X: &str = "maxX";
/// Raw area height variable.
pub const MAX_Y: &str = "maxY";
/// Raw time-to-next-mission variable (duration string such as `4.0s`).
pub const TTNM: &str = "ttnm";
/// Node count variable.
pub const NUMBER_NODES: &str = "numberNodes";
/// MAC protocol variable.
pub const MAC_PROTOCOL: &str = "macProtocol";
/// Normalized area label derived from `maxX`/`maxY`.
pub const DIMENSIONS: &str = "dimensions";
/// Normalized mission interval in seconds derived from `ttnm`.
pub const TIME_TO_NEXT_MISSION: &str = "timeToNextMission";

/// A single normalized metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Integer counts such as `numberNodes`.
    Int(i64),
    /// Floating point quantities such as `timeToNextMission`.
    Float(f64),
    /// Everything else, kept verbatim.
    Text(String),
}

impl MetaValue {
    /// Returns the string payload for textual values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Type-tagged representation used inside group keys so that `"4"` and
    /// `4` never collapse into the same bucket.
    pub fn key_repr(&self) -> String {
        match self {
            MetaValue::Int(value) => format!("i:{value}"),
            MetaValue::Float(value) => format!("f:{value:?}"),
            MetaValue::Text(text) => format!("t:{text}"),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Int(value) => write!(f, "{value}"),
            MetaValue::Float(value) => write!(f, "{value}"),
            MetaValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Text(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

/// Normalized parameter mapping for one experiment run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentMetadata(BTreeMap<String, MetaValue>);

impl ExperimentMetadata {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts or replaces a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Looks up a field.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    /// Looks up a textual field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(MetaValue::as_text)
    }

    /// Returns a copy without the listed fields.
    pub fn without(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(key, _)| !keys.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Iterates the fields in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetaValue)> {
        self.0.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no field is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sorted `(field, tagged value)` pairs forming the grouping identity.
    pub fn canonical_items(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| (key.clone(), value.key_repr()))
            .collect()
    }
}

impl FromIterator<(String, MetaValue)> for ExperimentMetadata {
    fn from_iter<I: IntoIterator<Item = (String, MetaValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parses a duration string such as `4.0s` (or a bare number) into seconds.
pub fn parse_seconds(value: &str) -> Result<f64, AggError> {
    let text = value.trim();
    let text = text.strip_suffix('s').unwrap_or(text);
    text.trim().parse::<f64>().map_err(|_| {
        AggError::NonNumericValue(
            ErrorInfo::new("rlora_core.duration_parse", "duration is not numeric")
                .with_context("value", value),
        )
    })
}

fn strip_quotes(value: &str) -> &str {
    value.trim().trim_matches('"')
}

/// Normalizes raw iteration variables into a grouping-ready mapping.
///
/// `mobility` and the raw area fields are dropped, the area becomes a single
/// `dimensions` label (`maxX` preferred over `maxY`), `ttnm` becomes
/// `timeToNextMission` in seconds and `numberNodes` becomes an integer when it
/// parses as one.
pub fn normalize_metadata(raw: &BTreeMap<String, String>) -> Result<ExperimentMetadata, AggError> {
    let mut meta = ExperimentMetadata::new();
    for (key, value) in raw {
        let value = strip_quotes(value);
        match key.as_str() {
            MOBILITY | MAX_X | MAX_Y | TTNM => {}
            NUMBER_NODES => match value.parse::<i64>() {
                Ok(count) => meta.insert(key.clone(), count),
                Err(_) => meta.insert(key.clone(), value),
            },
            _ => meta.insert(key.clone(), value),
        }
    }

    let area = [MAX_X, MAX_Y]
        .iter()
        .filter_map(|key| raw.get(*key))
        .map(|value| strip_quotes(value))
        .find(|value| !value.is_empty());
    if let Some(area) = area {
        meta.insert(DIMENSIONS, area);
    }

    if let Some(ttnm) = raw.get(TTNM) {
        let seconds = parse_seconds(strip_quotes(ttnm))?;
        meta.insert(TIME_TO_NEXT_MISSION, seconds);
    }

    Ok(meta)
}
