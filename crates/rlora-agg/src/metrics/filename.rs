//! Structured run file names of the plain-text summaries.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use rlora_core::errors::{AggError, ErrorInfo};
use rlora_core::metadata::{DIMENSIONS, MAC_PROTOCOL, NUMBER_NODES, TIME_TO_NEXT_MISSION};
use rlora_core::{parse_seconds, ExperimentMetadata};

fn run_name_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^mac(?P<protocol>[A-Za-z0-9]+)-maxX(?P<max_x>[0-9]+m)-ttnm(?P<ttnm>[0-9.]+)s-numberNodes(?P<nodes>[0-9]+)-m(?P<mobility>[A-Za-z]+)-(?P<run>[0-9]+)\.txt$",
        )
        .expect("run file name pattern is valid")
    })
}

/// Parameters encoded in `mac<P>-maxX<N>m-ttnm<F>s-numberNodes<N>-m<Mobility>-<run>.txt`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFileName {
    /// MAC protocol name.
    pub protocol: String,
    /// Area width label including the `m` suffix.
    pub max_x: String,
    /// Time to next mission in seconds.
    pub ttnm_seconds: f64,
    /// Node count.
    pub number_nodes: i64,
    /// Mobility model.
    pub mobility: String,
    /// Repetition index.
    pub run: u64,
}

impl RunFileName {
    /// Parses a bare file name.
    pub fn parse(file_name: &str) -> Result<Self, AggError> {
        let caps = run_name_regex().captures(file_name).ok_or_else(|| {
            AggError::FilenamePatternMismatch(
                ErrorInfo::new(
                    "rlora_agg.filename_pattern",
                    "filename does not match expected pattern",
                )
                .with_context("file", file_name),
            )
        })?;
        let ttnm_seconds = parse_seconds(&caps["ttnm"])?;
        let number_nodes = caps["nodes"].parse::<i64>().map_err(|err| {
            AggError::NonNumericValue(
                ErrorInfo::new("rlora_agg.filename_nodes", err.to_string())
                    .with_context("file", file_name),
            )
        })?;
        let run = caps["run"].parse::<u64>().map_err(|err| {
            AggError::NonNumericValue(
                ErrorInfo::new("rlora_agg.filename_run", err.to_string())
                    .with_context("file", file_name),
            )
        })?;
        Ok(Self {
            protocol: caps["protocol"].to_string(),
            max_x: caps["max_x"].to_string(),
            ttnm_seconds,
            number_nodes,
            mobility: caps["mobility"].to_string(),
            run,
        })
    }

    /// Parses the file name component of a path.
    pub fn from_path(path: &Path) -> Result<Self, AggError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&name)
    }

    /// Grouping metadata; mobility and run index are deliberately absent.
    pub fn metadata(&self) -> ExperimentMetadata {
        let mut meta = ExperimentMetadata::new();
        meta.insert(MAC_PROTOCOL, self.protocol.as_str());
        meta.insert(DIMENSIONS, self.max_x.as_str());
        meta.insert(TIME_TO_NEXT_MISSION, self.ttnm_seconds);
        meta.insert(NUMBER_NODES, self.number_nodes);
        meta
    }
}
