pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "huddle",
    about = "Huddle operator CLI",
    long_about = "Operate Huddle migrations, demo fixtures, readiness checks, and schedule previews.",
    after_help = "Examples:\n  huddle doctor --json\n  huddle seed\n  huddle next-run --cadence weekly --timezone Europe/Helsinki"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load deterministic demo fixtures (templates, employees, one pulse agent)")]
    Seed,
    #[command(about = "Validate config, database connectivity, and model credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Preview the next scheduled run for a cadence and timezone")]
    NextRun {
        #[arg(long, help = "Cadence: once, daily, weekly, biweekly, or monthly")]
        cadence: String,
        #[arg(long, default_value = "UTC", help = "IANA timezone for local run-hour math")]
        timezone: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::NextRun { cadence, timezone } => commands::next_run::run(&cadence, &timezone),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
