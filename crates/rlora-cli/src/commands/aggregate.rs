use std::error::Error;

use clap::Args;
use rlora_agg::{aggregate_all, MetricKind};
use tracing::info;

use super::{resolve_settings, CommonArgs};

#[derive(Args, Debug)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Metric kind to aggregate (repeatable); all kinds when omitted.
    #[arg(long = "metric", value_name = "KIND")]
    pub metrics: Vec<MetricKind>,
    /// Simulated seconds per run used by normalized throughput.
    #[arg(long)]
    pub sim_duration: Option<f64>,
}

pub fn run(args: &AggregateArgs) -> Result<(), Box<dyn Error>> {
    let mut settings = resolve_settings(&args.common)?;
    if let Some(duration) = args.sim_duration {
        settings.sim_duration_seconds = duration;
    }
    let kinds = if args.metrics.is_empty() {
        MetricKind::ALL.to_vec()
    } else {
        args.metrics.clone()
    };
    info!(
        data = %settings.data_dir().display(),
        output = %settings.output_dir().display(),
        kinds = kinds.len(),
        "starting aggregation"
    );
    let outcomes = aggregate_all(&kinds, &settings)?;
    for outcome in &outcomes {
        println!(
            "{}: parsed={} skipped={} dropped_groups={} reports={}",
            outcome.kind,
            outcome.parsed,
            outcome.skipped,
            outcome.dropped_groups,
            outcome.reports.len()
        );
    }
    Ok(())
}
