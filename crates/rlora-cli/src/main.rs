use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    aggregate::{self, AggregateArgs},
    coverage::{self, CoverageArgs},
    flatten::{self, FlattenArgs},
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

const DEFAULT_LOG_FILTER: &str = "warn,rlora_agg=info,rlora_cli=info";

#[derive(Parser, Debug)]
#[command(name = "rlora", about = "LoRa simulation campaign post-processing CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate repeated runs into per-(protocol, dimension) metric reports.
    Aggregate(AggregateArgs),
    /// Reduce raw vector exports in place to their flattened form.
    Flatten(FlattenArgs),
    /// Report which (ttnm, numberNodes) combinations exist per partition.
    Coverage(CoverageArgs),
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Aggregate(args) => aggregate::run(&args),
        Command::Flatten(args) => flatten::run(&args),
        Command::Coverage(args) => coverage::run(&args),
    }
}
