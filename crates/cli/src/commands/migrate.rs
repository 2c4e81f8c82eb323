use crate::commands::{load_config, run_blocking, CommandResult, ErrorClass};
use huddle_db::{connect, migrations};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let outcome = match run_blocking("migrate", async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| (ErrorClass::DbConnectivity, error.to_string()))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| (ErrorClass::Migration, error.to_string()))?;
        pool.close().await;
        Ok::<(), (ErrorClass, String)>(())
    }) {
        Ok(outcome) => outcome,
        Err(result) => return result,
    };

    match outcome {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err((class, message)) => CommandResult::failure("migrate", class, message),
    }
}
