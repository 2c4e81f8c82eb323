use tracing::warn;

use huddle_core::audit::{AuditEvent, AuditSink};

use super::{format_ts, AuditEventStore, RepositoryError};
use crate::DbPool;

pub struct SqlAuditEventStore {
    pool: DbPool,
}

impl SqlAuditEventStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuditEventStore for SqlAuditEventStore {
    async fn append(&self, event: AuditEvent) -> Result<(), RepositoryError> {
        let metadata_json = serde_json::to_string(&event.metadata)
            .map_err(|error| RepositoryError::decode(format!("bad audit metadata: {error}")))?;

        sqlx::query(
            "INSERT INTO audit_event
                 (event_id, conversation_id, run_id, correlation_id, event_type, category,
                  actor, outcome, metadata_json, occurred_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.event_id)
        .bind(event.conversation_id.as_ref().map(|id| id.0.clone()))
        .bind(&event.run_id)
        .bind(&event.correlation_id)
        .bind(&event.event_type)
        .bind(event.category.as_str())
        .bind(&event.actor)
        .bind(event.outcome.as_str())
        .bind(metadata_json)
        .bind(format_ts(event.occurred_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// `AuditSink::emit` is synchronous, so the insert runs on a spawned task.
/// A failed audit insert is logged and never fails the operation that
/// produced it.
#[derive(Clone)]
pub struct SqlAuditSink {
    pool: DbPool,
}

impl SqlAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AuditSink for SqlAuditSink {
    fn emit(&self, event: AuditEvent) {
        let store = SqlAuditEventStore::new(self.pool.clone());
        tokio::spawn(async move {
            let event_type = event.event_type.clone();
            if let Err(error) = store.append(event).await {
                warn!(%event_type, %error, "failed to persist audit event");
            }
        });
    }
}
