pub mod bootstrap;
pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "ecomarket",
    about = "EcoMarket returns assistant CLI",
    long_about = "Chat with the EcoMarket order-tracking and returns assistant, run single \
                  turns for scripting, seed demo data, and inspect runtime readiness.",
    after_help = "Examples:\n  ecomarket chat\n  ecomarket turn --session demo \"quiero devolver mi pedido 20002\"\n  ecomarket doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive conversation with the assistant")]
    Chat {
        #[arg(long, help = "Session id to resume; a fresh one is generated when omitted")]
        session: Option<String>,
    },
    #[command(about = "Run a single turn and print the structured outcome as JSON")]
    Turn {
        #[arg(long, help = "Session id the turn belongs to")]
        session: String,
        #[arg(help = "The customer utterance")]
        text: String,
    },
    #[command(about = "Load the demo order dataset and verify it against its contract")]
    Seed,
    #[command(about = "Inspect effective configuration values with secret redaction")]
    Config,
    #[command(about = "Validate config, database connectivity, and responder readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { session } => commands::chat::run(session),
        Command::Turn { session, text } => commands::turn::run(&session, &text),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
