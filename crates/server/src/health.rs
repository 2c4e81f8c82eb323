use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use huddle_core::config::{LlmConfig, LlmProvider};
use huddle_db::DbPool;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    llm: LlmConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub model: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, llm: LlmConfig) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, llm })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    db_pool: DbPool,
    llm: LlmConfig,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(db_pool, llm)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

/// Readiness gates on the database only. A model without credentials still
/// serves check-ins with fallback copy, so it is surfaced but never fails
/// the probe.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let model = model_check(&state.llm);
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        model,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

fn model_check(llm: &LlmConfig) -> HealthCheck {
    let needs_key = llm.provider != LlmProvider::Ollama;
    if needs_key && llm.api_key.is_none() {
        return HealthCheck {
            status: "fallback",
            detail: "no API key configured; replies use fallback copy".to_string(),
        };
    }

    HealthCheck { status: "ready", detail: format!("model `{}` configured", llm.model) }
}
