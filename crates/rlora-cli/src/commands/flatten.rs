use std::error::Error;

use clap::Args;
use rlora_agg::flatten;

use super::{resolve_settings, CommonArgs};

#[derive(Args, Debug)]
pub struct FlattenArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn run(args: &FlattenArgs) -> Result<(), Box<dyn Error>> {
    let settings = resolve_settings(&args.common)?;
    let outcome = flatten(&settings.data_dir())?;
    println!(
        "rewritten={} already_flat={} failed={}",
        outcome.rewritten, outcome.already_flat, outcome.failed
    );
    Ok(())
}
