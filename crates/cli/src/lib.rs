pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "shopmate",
    about = "Shopmate operator CLI",
    long_about = "Operate the shopmate agent: one-shot queries, demo fixtures, and readiness checks.",
    after_help = "Examples:\n  shopmate ask \"Покажи продукты\"\n  shopmate seed\n  shopmate doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run one query through the full agent pipeline and print the reply")]
    Ask { query: String },
    #[command(about = "Apply pending migrations and load the demo catalog fixtures")]
    Seed,
    #[command(about = "Validate config, database connectivity, and tool server startup")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Ask { query } => commands::ask::run(&query).await,
        Command::Seed => commands::seed::run().await,
        Command::Doctor { json } => commands::doctor::run(json).await,
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
