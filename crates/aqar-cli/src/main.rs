//! # aqar CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// Back-office pricing toolchain.
///
/// Evaluates custom payment plans against the standard-plan benchmark and
/// generates dated schedules for reservation and contract documents.
#[derive(Parser, Debug)]
#[command(name = "aqar", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Evaluate a payment plan request.
    Calc(aqar_cli::calc::CalcArgs),
    /// Generate the dated, words-annotated schedule.
    Plan(aqar_cli::plan::PlanArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Calc(args) => aqar_cli::calc::run(args).await,
        Commands::Plan(args) => aqar_cli::plan::run(args).await,
    }
}
