use crate::commands::{load_config, run_blocking, CommandResult, ErrorClass};
use huddle_db::{connect, migrations, DemoSeedDataset};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let outcome = match run_blocking("seed", async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| (ErrorClass::DbConnectivity, error.to_string()))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| (ErrorClass::Migration, error.to_string()))?;
        let report = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| (ErrorClass::SeedExecution, error.to_string()))?;
        pool.close().await;
        Ok::<_, (ErrorClass, String)>(report)
    }) {
        Ok(outcome) => outcome,
        Err(result) => return result,
    };

    match outcome {
        Ok(report) => CommandResult::success(
            "seed",
            format!(
                "demo dataset loaded: {} templates, {} employees, {} instances, {} schedules",
                report.templates, report.employees, report.instances, report.schedules
            ),
        ),
        Err((class, message)) => CommandResult::failure("seed", class, message),
    }
}
