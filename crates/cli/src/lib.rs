pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "careline",
    about = "Careline operator CLI",
    long_about = "Inspect Careline configuration, check runtime readiness, apply migrations, and drive the demo scenarios against a running backend.",
    after_help = "Examples:\n  careline doctor --json\n  careline scenarios\n  careline ask --scenario 3"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, completion credentials, DB connectivity, and the corpus")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the canned demo scenarios")]
    Scenarios,
    #[command(about = "Send a scenario or free-form question to a running backend")]
    Ask(commands::ask::AskArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Scenarios => {
            commands::CommandResult { exit_code: 0, output: commands::scenarios::run() }
        }
        Command::Ask(args) => commands::ask::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn parses_scenario_ask() {
        let cli = Cli::parse_from(["careline", "ask", "--scenario", "3", "--json"]);
        let Command::Ask(args) = cli.command else {
            panic!("expected ask command");
        };
        assert_eq!(args.scenario, Some(3));
        assert!(args.json);
        assert_eq!(args.backend_url, "http://localhost:8000");
    }

    #[test]
    fn parses_doctor_json_flag() {
        let cli = Cli::parse_from(["careline", "doctor", "--json"]);
        assert!(matches!(cli.command, Command::Doctor { json: true }));
    }
}
