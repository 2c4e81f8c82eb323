use sqlx::Row;

use huddle_core::domain::agent::{EmployeeId, InstanceId};
use huddle_core::domain::conversation::{
    ContentType, Conversation, ConversationId, ConversationStatus, Message, MessageId, SenderType,
};

use super::{format_ts, parse_ts, ConversationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn count_from_row(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<u32, RepositoryError> {
    let raw = row.get::<i64, _>(column);
    u32::try_from(raw)
        .map_err(|_| RepositoryError::decode(format!("negative counter in `{column}`: {raw}")))
}

fn conversation_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, RepositoryError> {
    let status = row
        .get::<String, _>("status")
        .parse::<ConversationStatus>()
        .map_err(RepositoryError::decode)?;

    let last_message_at = row
        .get::<Option<String>, _>("last_message_at")
        .as_deref()
        .map(parse_ts)
        .transpose()?;

    Ok(Conversation {
        id: ConversationId(row.get("id")),
        instance_id: InstanceId(row.get("instance_id")),
        employee_id: EmployeeId(row.get("employee_id")),
        status,
        message_count: count_from_row(row, "message_count")?,
        unread_count: count_from_row(row, "unread_count")?,
        last_message_at,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
    })
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Message, RepositoryError> {
    let sender_type = row
        .get::<String, _>("sender_type")
        .parse::<SenderType>()
        .map_err(RepositoryError::decode)?;
    let content_type = row
        .get::<String, _>("content_type")
        .parse::<ContentType>()
        .map_err(RepositoryError::decode)?;

    Ok(Message {
        id: MessageId(row.get("id")),
        conversation_id: ConversationId(row.get("conversation_id")),
        sender_type,
        content: row.get("content"),
        content_type,
        is_read: row.get::<i64, _>("is_read") != 0,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
    })
}

async fn insert_message(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    message: &Message,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO message
             (id, conversation_id, sender_type, content, content_type, is_read, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&message.id.0)
    .bind(&message.conversation_id.0)
    .bind(message.sender_type.as_str())
    .bind(&message.content)
    .bind(message.content_type.as_str())
    .bind(i64::from(message.is_read))
    .bind(format_ts(message.created_at))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, instance_id, employee_id, status, message_count, unread_count,
                    last_message_at, created_at
             FROM conversation WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn find_open_for_pair(
        &self,
        instance_id: &InstanceId,
        employee_id: &EmployeeId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, instance_id, employee_id, status, message_count, unread_count,
                    last_message_at, created_at
             FROM conversation
             WHERE instance_id = ? AND employee_id = ? AND status = 'active'
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(&instance_id.0)
        .bind(&employee_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn find_latest_for_pair(
        &self,
        instance_id: &InstanceId,
        employee_id: &EmployeeId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, instance_id, employee_id, status, message_count, unread_count,
                    last_message_at, created_at
             FROM conversation
             WHERE instance_id = ? AND employee_id = ?
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(&instance_id.0)
        .bind(&employee_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn create(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversation
                 (id, instance_id, employee_id, status, message_count, unread_count,
                  last_message_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&conversation.id.0)
        .bind(&conversation.instance_id.0)
        .bind(&conversation.employee_id.0)
        .bind(conversation.status.as_str())
        .bind(i64::from(conversation.message_count))
        .bind(i64::from(conversation.unread_count))
        .bind(conversation.last_message_at.map(format_ts))
        .bind(format_ts(conversation.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE conversation SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_employee_message(&self, message: Message) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        insert_message(&mut tx, &message).await?;
        sqlx::query(
            "UPDATE conversation
             SET message_count = message_count + 1, last_message_at = ?
             WHERE id = ?",
        )
        .bind(format_ts(message.created_at))
        .bind(&message.conversation_id.0)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn append_agent_message(&self, message: Message) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        insert_message(&mut tx, &message).await?;
        sqlx::query(
            "UPDATE conversation
             SET message_count = message_count + 1,
                 unread_count = unread_count + 1,
                 last_message_at = ?
             WHERE id = ?",
        )
        .bind(format_ts(message.created_at))
        .bind(&message.conversation_id.0)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_recent_messages(
        &self,
        id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        // Take the newest `limit` rows, then restore chronological order.
        let rows = sqlx::query(
            "SELECT id, conversation_id, sender_type, content, content_type, is_read, created_at
             FROM (
                 SELECT * FROM message
                 WHERE conversation_id = ?
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?
             )
             ORDER BY created_at ASC, id ASC",
        )
        .bind(&id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }
}
