use sqlx::Row;

use huddle_core::domain::conversation::{ConversationId, MessageId};
use huddle_core::domain::escalation::{
    EscalationId, EscalationRecord, EscalationSeverity, EscalationStatus, EscalationType,
};

use super::{format_ts, parse_ts, EscalationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEscalationRepository {
    pool: DbPool,
}

impl SqlEscalationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<EscalationRecord, RepositoryError> {
    let escalation_type = row
        .get::<String, _>("escalation_type")
        .parse::<EscalationType>()
        .map_err(RepositoryError::decode)?;
    let severity = row
        .get::<String, _>("severity")
        .parse::<EscalationSeverity>()
        .map_err(RepositoryError::decode)?;
    let status = row
        .get::<String, _>("status")
        .parse::<EscalationStatus>()
        .map_err(RepositoryError::decode)?;

    Ok(EscalationRecord {
        id: EscalationId(row.get("id")),
        conversation_id: ConversationId(row.get("conversation_id")),
        trigger_message_id: MessageId(row.get("trigger_message_id")),
        escalation_type,
        severity,
        description: row.get("description"),
        status,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
    })
}

#[async_trait::async_trait]
impl EscalationRepository for SqlEscalationRepository {
    async fn create(&self, record: EscalationRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO escalation
                 (id, conversation_id, trigger_message_id, escalation_type, severity,
                  description, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.conversation_id.0)
        .bind(&record.trigger_message_id.0)
        .bind(record.escalation_type.as_str())
        .bind(record.severity.as_str())
        .bind(&record.description)
        .bind(record.status.as_str())
        .bind(format_ts(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_open_for_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<EscalationRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, conversation_id, trigger_message_id, escalation_type, severity,
                    description, status, created_at
             FROM escalation
             WHERE conversation_id = ? AND status = 'open'
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(&conversation_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }
}
