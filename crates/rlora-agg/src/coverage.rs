use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use rlora_core::errors::AggError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, CatalogEvent, NamePattern, Partition};

/// Mission intervals swept by the campaign.
pub const DEFAULT_TTNM_VALUES: [&str; 25] = [
    "0.1s", "0.2s", "0.4s", "0.8s", "1s", "2s", "4s", "6s", "9s", "12s", "16s", "20s", "25s",
    "30s", "36s", "42s", "49s", "56s", "63s", "72s", "80s", "90s", "99s", "109s", "120s",
];

/// Node counts swept by the campaign.
pub const DEFAULT_NUMBER_NODES: [i64; 19] = [
    10, 11, 12, 14, 16, 19, 22, 26, 30, 35, 40, 46, 52, 59, 66, 74, 82, 91, 100,
];

/// Parameter grid every partition is expected to cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGrid {
    /// Mission interval labels, compared verbatim (`4s` and `4.0s` differ).
    #[serde(default = "CoverageGrid::default_ttnm_values")]
    pub ttnm_values: Vec<String>,
    /// Node counts.
    #[serde(default = "CoverageGrid::default_number_nodes")]
    pub number_nodes: Vec<i64>,
}

impl CoverageGrid {
    fn default_ttnm_values() -> Vec<String> {
        DEFAULT_TTNM_VALUES.iter().map(|v| v.to_string()).collect()
    }
    fn default_number_nodes() -> Vec<i64> {
        DEFAULT_NUMBER_NODES.to_vec()
    }

    fn pairs(&self) -> BTreeSet<ParameterPair> {
        self.ttnm_values
            .iter()
            .flat_map(|ttnm| {
                self.number_nodes.iter().map(move |nodes| ParameterPair {
                    ttnm: ttnm.clone(),
                    number_nodes: *nodes,
                })
            })
            .collect()
    }
}

impl Default for CoverageGrid {
    fn default() -> Self {
        Self {
            ttnm_values: Self::default_ttnm_values(),
            number_nodes: Self::default_number_nodes(),
        }
    }
}

/// One `(ttnm, numberNodes)` combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParameterPair {
    /// Mission interval label with its `s` suffix.
    pub ttnm: String,
    /// Node count.
    pub number_nodes: i64,
}

/// A present combination and how many files carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCount {
    /// The combination.
    #[serde(flatten)]
    pub pair: ParameterPair,
    /// Matching files.
    pub count: usize,
}

/// Coverage of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionCoverage {
    /// Partition scanned.
    pub partition: Partition,
    /// Files inspected.
    pub files: usize,
    /// Combinations found, sorted.
    pub present: Vec<PairCount>,
    /// Grid combinations without any file, sorted.
    pub missing: Vec<ParameterPair>,
}

/// Coverage of every non-empty partition, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Per-partition results.
    pub partitions: Vec<PartitionCoverage>,
}

impl CoverageReport {
    /// Total number of missing combinations.
    pub fn missing_total(&self) -> usize {
        self.partitions.iter().map(|p| p.missing.len()).sum()
    }
}

fn pair_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        RegexBuilder::new(r"ttnm(?P<ttnm>[0-9.]+)s.*numberNodes(?P<nodes>[0-9]+)")
            .case_insensitive(true)
            .build()
            .expect("coverage pattern is valid")
    })
}

/// Extracts the `(ttnm, numberNodes)` pair embedded anywhere in a file name.
pub fn scan_pair(file_name: &str) -> Option<ParameterPair> {
    let caps = pair_regex().captures(file_name)?;
    let number_nodes = caps["nodes"].parse().ok()?;
    Some(ParameterPair {
        ttnm: format!("{}s", &caps["ttnm"]),
        number_nodes,
    })
}

fn partition_coverage(
    partition: Partition,
    files: usize,
    counts: BTreeMap<ParameterPair, usize>,
    expected: &BTreeSet<ParameterPair>,
) -> PartitionCoverage {
    let missing = expected
        .iter()
        .filter(|pair| !counts.contains_key(*pair))
        .cloned()
        .collect();
    let present = counts
        .into_iter()
        .map(|(pair, count)| PairCount { pair, count })
        .collect();
    PartitionCoverage {
        partition,
        files,
        present,
        missing,
    }
}

/// Counts parameter combinations per partition against `grid`.
///
/// Partitions without any file are left out of the report.
pub fn coverage(catalog: &Catalog, grid: &CoverageGrid) -> Result<CoverageReport, AggError> {
    let pattern = NamePattern::new::<&str>(&[])?;
    let expected = grid.pairs();
    let mut report = CoverageReport::default();
    let mut counts: BTreeMap<ParameterPair, usize> = BTreeMap::new();
    let mut files = 0usize;

    for event in catalog.iter(&pattern) {
        match event {
            CatalogEvent::File { path, .. } => {
                files += 1;
                if let Some(pair) = file_name(&path).and_then(|name| scan_pair(&name)) {
                    *counts.entry(pair).or_default() += 1;
                }
            }
            CatalogEvent::PartitionEnd { partition } => {
                let seen = std::mem::take(&mut counts);
                let scanned = std::mem::take(&mut files);
                if scanned == 0 {
                    debug!(partition = %partition, "empty partition");
                    continue;
                }
                report
                    .partitions
                    .push(partition_coverage(partition, scanned, seen, &expected));
            }
        }
    }
    Ok(report)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, partition) in self.partitions.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "=== {} ===", partition.partition)?;
            writeln!(f, "  Combinations present (count > 0):")?;
            for entry in &partition.present {
                writeln!(
                    f,
                    "    ttnm={}, numberNodes={}: {}",
                    entry.pair.ttnm, entry.pair.number_nodes, entry.count
                )?;
            }
            if partition.missing.is_empty() {
                writeln!(f, "  No missing combinations.")?;
            } else {
                writeln!(f, "  Missing combinations:")?;
                for pair in &partition.missing {
                    writeln!(f, "    ttnm={}, numberNodes={}", pair.ttnm, pair.number_nodes)?;
                }
            }
        }
        Ok(())
    }
}
