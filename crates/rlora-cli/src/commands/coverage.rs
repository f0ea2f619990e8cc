use std::error::Error;

use clap::Args;
use rlora_agg::coverage;

use super::{resolve_settings, CommonArgs};

#[derive(Args, Debug)]
pub struct CoverageArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &CoverageArgs) -> Result<(), Box<dyn Error>> {
    let settings = resolve_settings(&args.common)?;
    let report = coverage(&settings.catalog(), &settings.coverage)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
