//! # Calc Subcommand
//!
//! Evaluates a payment plan request and prints the response envelope,
//! schedule and acceptance decision included, as JSON.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use clap::Args;

use aqar_pricing::AcceptanceThresholds;
use aqar_service::{calculate, CalculateRequest, ThresholdsCache};

/// Arguments for the calc subcommand.
#[derive(Args, Debug)]
pub struct CalcArgs {
    /// Path to the request JSON; "-" reads stdin.
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Path to a thresholds JSON overriding the unbounded defaults.
    #[arg(long)]
    pub thresholds: Option<std::path::PathBuf>,

    /// Exit nonzero when the evaluation rejects the plan.
    #[arg(long)]
    pub strict: bool,
}

pub async fn run(args: CalcArgs) -> anyhow::Result<()> {
    let request: CalculateRequest = serde_json::from_str(&read_input(&args.input)?)
        .context("parsing calculation request")?;
    let cache = ThresholdsCache::new(load_thresholds(args.thresholds.as_deref())?);

    let response = calculate(&request, &cache).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if args.strict && !response.evaluation.is_accepted() {
        anyhow::bail!("plan rejected by acceptance evaluation");
    }
    Ok(())
}

/// Read the request body from a file or stdin.
pub(crate) fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading request from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading request from {input}"))
    }
}

/// Load thresholds from disk, falling back to the unbounded defaults.
pub(crate) fn load_thresholds(path: Option<&Path>) -> anyhow::Result<AcceptanceThresholds> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading thresholds from {}", path.display()))?;
            serde_json::from_str(&raw).context("parsing thresholds")
        }
        None => Ok(AcceptanceThresholds::default()),
    }
}
