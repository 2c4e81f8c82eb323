use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;

use crate::commands::{CommandResult, ErrorClass};
use huddle_core::scheduler::Scheduler;

#[derive(Debug, Serialize)]
struct NextRunPreview {
    cadence: String,
    timezone: String,
    next_run_at: String,
    fallback_applied: bool,
}

pub fn run(cadence: &str, timezone: &str) -> CommandResult {
    let tz = match timezone.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            return CommandResult::failure(
                "next-run",
                ErrorClass::TimezoneValidation,
                format!("unknown timezone `{timezone}`"),
            );
        }
    };

    let computed = Scheduler::new().next_run_raw(cadence, Utc::now(), tz);
    let preview = NextRunPreview {
        cadence: cadence.to_string(),
        timezone: timezone.to_string(),
        next_run_at: computed.at.to_rfc3339(),
        fallback_applied: computed.fallback_applied,
    };

    match serde_json::to_string(&preview) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => {
            CommandResult::failure("next-run", ErrorClass::Serialization, error.to_string())
        }
    }
}
