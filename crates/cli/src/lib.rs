pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use intake_core::config::{AppConfig, LoadOptions};

use crate::commands::replay::ReplayArgs;

#[derive(Debug, Parser)]
#[command(
    name = "intake",
    about = "Intake conversation operator CLI",
    long_about = "Inspect question catalogs, replay intake conversations, and check runtime configuration.",
    after_help = "Examples:\n  intake catalog --service \"Video Services\"\n  intake replay --service default --transcript chat.json --message \"Ana\"\n  intake doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "List services, or show the catalog a service resolves to")]
    Catalog {
        #[arg(long, help = "Service name to resolve")]
        service: Option<String>,
    },
    #[command(about = "Print the opening greeting for a service")]
    Opening {
        #[arg(long)]
        service: String,
    },
    #[command(about = "Rebuild conversation state from a JSON transcript, optionally applying one more message")]
    Replay {
        #[arg(long)]
        service: String,
        #[arg(long, help = "Path to a JSON array of {role, content} turns")]
        transcript: PathBuf,
        #[arg(long, help = "User message to apply after the transcript")]
        message: Option<String>,
        #[arg(long, help = "Seed for reproducible phrasing selection")]
        seed: Option<u64>,
    },
    #[command(about = "Validate config and catalog loading")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        logging::init_logging(&config.logging);
    }

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Catalog { service } => commands::catalog::run(service.as_deref()),
        Command::Opening { service } => commands::opening::run(&service),
        Command::Replay { service, transcript, message, seed } => {
            commands::replay::run(ReplayArgs { service, transcript, message, seed })
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
