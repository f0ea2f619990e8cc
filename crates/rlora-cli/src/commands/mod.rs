pub mod aggregate;
pub mod coverage;
pub mod flatten;

use std::path::{Path, PathBuf};

use clap::Args;
use rlora_agg::{load_settings, Settings};
use rlora_core::AggError;

/// Flags shared by every subcommand; they override file and environment values.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// YAML settings file; relative roots inside resolve against its directory.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Input tree holding `<protocol>/<dimension>/...`.
    #[arg(long)]
    pub data_root: Option<PathBuf>,
    /// Output tree for aggregated reports.
    #[arg(long)]
    pub output_root: Option<PathBuf>,
    /// Comma-separated protocol directories to scan.
    #[arg(long, value_delimiter = ',')]
    pub protocols: Vec<String>,
    /// Comma-separated dimension directories to scan.
    #[arg(long, value_delimiter = ',')]
    pub dimensions: Vec<String>,
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Defaults, then the settings file, then the environment, then flags.
pub fn resolve_settings(args: &CommonArgs) -> Result<Settings, AggError> {
    let mut settings = match &args.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    settings.apply_process_env();
    if let Some(root) = &args.data_root {
        settings.data_root = absolute(root);
    }
    if let Some(root) = &args.output_root {
        settings.output_root = absolute(root);
    }
    let protocols: Vec<String> = args
        .protocols
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if !protocols.is_empty() {
        settings.protocols = protocols;
    }
    let dimensions: Vec<String> = args
        .dimensions
        .iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();
    if !dimensions.is_empty() {
        settings.dimensions = dimensions;
    }
    settings.validate()?;
    Ok(settings)
}
