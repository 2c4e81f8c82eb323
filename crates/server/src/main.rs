mod api;
mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use huddle_core::config::{AppConfig, LoadOptions};

/// Polling interval of the due-schedule driver.
const SCHEDULE_POLL_SECS: u64 = 60;

fn init_logging(config: &AppConfig) {
    use huddle_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
        app.config.llm.clone(),
    )
    .await?;

    spawn_schedule_driver(app.orchestrator.clone());

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "huddle-server started"
    );

    let router = api::router(app.orchestrator.clone());
    tokio::select! {
        served = axum::serve(listener, router) => {
            served?;
        }
        shutdown = wait_for_shutdown() => {
            shutdown?;
        }
    }

    tracing::info!(event_name = "system.server.stopping", "huddle-server stopping");
    Ok(())
}

fn spawn_schedule_driver(orchestrator: std::sync::Arc<huddle_agent::Orchestrator>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(SCHEDULE_POLL_SECS));
        loop {
            ticker.tick().await;
            match orchestrator.run_due(Utc::now()).await {
                Ok(results) if !results.is_empty() => {
                    tracing::info!(
                        event_name = "system.scheduler.tick",
                        runs = results.len(),
                        "due schedules triggered"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::error!(
                        event_name = "system.scheduler.error",
                        %error,
                        "due-schedule poll failed"
                    );
                }
            }
        }
    });
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
