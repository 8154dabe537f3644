//! # Plan Subcommand
//!
//! Generates the full dated schedule for a request: evaluation plus due
//! dates and written amounts on every row.

use chrono::NaiveDate;
use clap::Args;

use anyhow::Context;

use aqar_ports::DigitWords;
use aqar_service::{generate_plan, CalculateRequest, GeneratePlanRequest, ThresholdsCache};

/// Arguments for the plan subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the request JSON; "-" reads stdin.
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Path to a thresholds JSON overriding the unbounded defaults.
    #[arg(long)]
    pub thresholds: Option<std::path::PathBuf>,

    /// Base date (YYYY-MM-DD) anchoring the schedule; falls back to the
    /// request's own first-payment or offer date.
    #[arg(long)]
    pub base_date: Option<NaiveDate>,
}

pub async fn run(args: PlanArgs) -> anyhow::Result<()> {
    let calculate: CalculateRequest =
        serde_json::from_str(&crate::calc::read_input(&args.input)?)
            .context("parsing plan request")?;
    let cache = ThresholdsCache::new(crate::calc::load_thresholds(args.thresholds.as_deref())?);

    let request = GeneratePlanRequest {
        calculate,
        base_date: args.base_date,
    };
    let response = generate_plan(&request, &cache, &DigitWords).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
