use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use huddle_agent::{Orchestrator, OpenAiCompatibleClient, ResponseGenerator, TokioBackoff};
use huddle_core::config::{AppConfig, ConfigError, LoadOptions};
use huddle_core::safety::SafetyClassifier;
use huddle_db::repositories::{
    SqlAuditSink, SqlConversationRepository, SqlEmployeeDirectory, SqlEscalationRepository,
    SqlInstanceRepository, SqlScheduleRepository,
};
use huddle_db::{connect, migrations, DbPool};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let orchestrator = Arc::new(build_orchestrator(&config, db_pool.clone()));

    Ok(Application { config, db_pool, orchestrator })
}

fn build_orchestrator(config: &AppConfig, db_pool: DbPool) -> Orchestrator {
    let model = Arc::new(OpenAiCompatibleClient::from_config(&config.llm));
    let generator =
        ResponseGenerator::new(model, SafetyClassifier::default(), Arc::new(TokioBackoff));

    Orchestrator::new(
        Arc::new(SqlInstanceRepository::new(db_pool.clone())),
        Arc::new(SqlScheduleRepository::new(db_pool.clone())),
        Arc::new(SqlConversationRepository::new(db_pool.clone())),
        Arc::new(SqlEscalationRepository::new(db_pool.clone())),
        Arc::new(SqlEmployeeDirectory::new(db_pool.clone())),
        generator,
        SafetyClassifier::default(),
        Arc::new(SqlAuditSink::new(db_pool)),
    )
}
