use std::fs;
use std::path::{Path, PathBuf};

use rlora_core::errors::{AggError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::coverage::CoverageGrid;
use crate::report::ReportWriter;
use crate::serde::from_yaml_slice;

/// MAC protocol directories scanned when no override is supplied.
pub const DEFAULT_PROTOCOLS: [&str; 8] = [
    "Aloha",
    "Csma",
    "MeshRouter",
    "RSMiTra",
    "IRSMiTra",
    "RSMiTraNR",
    "RSMiTraNAV",
    "MiRS",
];

/// Area dimension directories scanned when no override is supplied.
pub const DEFAULT_DIMENSIONS: [&str; 4] = ["300m", "1000m", "5000m", "10000m"];

/// Simulated time per run, used to normalize byte counts.
pub const DEFAULT_SIM_DURATION_SECONDS: f64 = 600.0;

/// Base directory override.
pub const ROOT_ENV: &str = "RLORA_ROOT";
/// Base directory override spelled the way the campaign scripts export it.
pub const LEGACY_ROOT_ENV: &str = "rlora_root";
/// Comma-separated protocol override.
pub const PROTOCOLS_ENV: &str = "RLORA_PROTOCOLS";
/// Comma-separated dimension override.
pub const DIMENSIONS_ENV: &str = "RLORA_DIMENSIONS";

fn config_error(code: &str, message: impl Into<String>) -> AggError {
    AggError::Config(ErrorInfo::new(code, message))
}

/// Resolved configuration for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Input tree, relative paths resolve against `base_dir`.
    #[serde(default = "Settings::default_data_root")]
    pub data_root: PathBuf,
    /// Output tree, relative paths resolve against `base_dir`.
    #[serde(default = "Settings::default_output_root")]
    pub output_root: PathBuf,
    /// Protocol directories in scan order.
    #[serde(default = "Settings::default_protocols")]
    pub protocols: Vec<String>,
    /// Dimension directories in scan order.
    #[serde(default = "Settings::default_dimensions")]
    pub dimensions: Vec<String>,
    /// Simulated seconds per run.
    #[serde(default = "Settings::default_sim_duration")]
    pub sim_duration_seconds: f64,
    /// Parameter grid expected by the coverage report.
    #[serde(default)]
    pub coverage: CoverageGrid,
    /// Directory relative roots are resolved against (not serialized).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Settings {
    fn default_data_root() -> PathBuf {
        PathBuf::from("data")
    }
    fn default_output_root() -> PathBuf {
        PathBuf::from("data_aggregated")
    }
    fn default_protocols() -> Vec<String> {
        DEFAULT_PROTOCOLS.iter().map(|p| p.to_string()).collect()
    }
    fn default_dimensions() -> Vec<String> {
        DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect()
    }
    fn default_sim_duration() -> f64 {
        DEFAULT_SIM_DURATION_SECONDS
    }

    /// Built-in defaults rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_root: Self::default_data_root(),
            output_root: Self::default_output_root(),
            protocols: Self::default_protocols(),
            dimensions: Self::default_dimensions(),
            sim_duration_seconds: Self::default_sim_duration(),
            coverage: CoverageGrid::default(),
            base_dir: base_dir.into(),
        }
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = lookup(ROOT_ENV)
            .or_else(|| lookup(LEGACY_ROOT_ENV))
            .filter(|value| !value.trim().is_empty());
        if let Some(root) = root {
            self.base_dir = PathBuf::from(root.trim());
        }
        if let Some(protocols) = lookup(PROTOCOLS_ENV).map(|raw| parse_list(&raw)) {
            if !protocols.is_empty() {
                self.protocols = protocols;
            }
        }
        if let Some(dimensions) = lookup(DIMENSIONS_ENV).map(|raw| parse_list(&raw)) {
            if !dimensions.is_empty() {
                self.dimensions = dimensions;
            }
        }
    }

    /// Applies the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Rejects settings that cannot drive a scan.
    pub fn validate(&self) -> Result<(), AggError> {
        if self.protocols.is_empty() {
            return Err(config_error("settings.protocols", "protocol list is empty"));
        }
        if self.dimensions.is_empty() {
            return Err(config_error("settings.dimensions", "dimension list is empty"));
        }
        if !(self.sim_duration_seconds.is_finite() && self.sim_duration_seconds > 0.0) {
            return Err(config_error(
                "settings.sim_duration",
                format!(
                    "sim_duration_seconds must be positive, got {}",
                    self.sim_duration_seconds
                ),
            ));
        }
        Ok(())
    }

    /// Absolute input directory.
    pub fn data_dir(&self) -> PathBuf {
        resolve(&self.base_dir, &self.data_root)
    }

    /// Absolute output directory.
    pub fn output_dir(&self) -> PathBuf {
        resolve(&self.base_dir, &self.output_root)
    }

    /// Path catalog over the configured partitions.
    pub fn catalog(&self) -> Catalog {
        Catalog::new(
            self.data_dir(),
            self.protocols.clone(),
            self.dimensions.clone(),
        )
    }

    /// Report writer rooted at the output directory.
    pub fn writer(&self) -> ReportWriter {
        ReportWriter::new(self.output_dir())
    }
}

impl Default for Settings {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_base_dir(cwd)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Splits a comma-separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Roots spelled out in a settings file, as opposed to defaulted ones.
#[derive(Debug, Default, Deserialize)]
struct ExplicitRoots {
    data_root: Option<PathBuf>,
    output_root: Option<PathBuf>,
}

/// Loads settings from a YAML file.
///
/// Roots given in the file are pinned to its directory, so a later
/// environment root only moves the defaulted ones.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, AggError> {
    let settings_path = path.as_ref();
    let bytes = fs::read(settings_path).map_err(|err| {
        AggError::Io(
            ErrorInfo::new("settings_read", err.to_string())
                .with_context("path", settings_path.display().to_string()),
        )
    })?;
    let mut settings: Settings = from_yaml_slice(&bytes)?;
    let explicit: ExplicitRoots = from_yaml_slice(&bytes)?;
    let file_dir = settings_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    if let Some(root) = explicit.data_root {
        settings.data_root = resolve(&file_dir, &root);
    }
    if let Some(root) = explicit.output_root {
        settings.output_root = resolve(&file_dir, &root);
    }
    settings.base_dir = file_dir;
    Ok(settings)
}
