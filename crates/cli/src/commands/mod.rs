pub mod doctor;
pub mod migrate;
pub mod next_run;
pub mod seed;

use huddle_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

/// Failure classes shared by the subcommands. Each maps to a stable exit
/// code so wrapper scripts can branch on what went wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    ConfigValidation,
    RuntimeInit,
    DbConnectivity,
    Migration,
    SeedExecution,
    TimezoneValidation,
    Serialization,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigValidation => "config_validation",
            Self::RuntimeInit => "runtime_init",
            Self::DbConnectivity => "db_connectivity",
            Self::Migration => "migration",
            Self::SeedExecution => "seed_execution",
            Self::TimezoneValidation => "timezone_validation",
            Self::Serialization => "serialization",
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            Self::ConfigValidation | Self::TimezoneValidation => 2,
            Self::RuntimeInit | Self::Serialization => 3,
            Self::DbConnectivity => 4,
            Self::Migration => 5,
            Self::SeedExecution => 6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(command: &str, class: ErrorClass, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(class.as_str().to_string()),
            message: message.into(),
        };
        Self { exit_code: class.exit_code(), output: serialize_payload(payload) }
    }
}

/// Loads the effective config, mapping trouble into the command envelope.
pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            ErrorClass::ConfigValidation,
            format!("configuration issue: {error}"),
        )
    })
}

/// Commands are synchronous entry points; each one spins up a small
/// current-thread runtime for its database work.
pub(crate) fn run_blocking<F: std::future::Future>(
    command: &str,
    future: F,
) -> Result<F::Output, CommandResult> {
    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                ErrorClass::RuntimeInit,
                format!("failed to initialize async runtime: {error}"),
            )
        })?;
    Ok(runtime.block_on(future))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
