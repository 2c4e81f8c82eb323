use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use huddle_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Opens a pool sized and timed from the `[database]` section of the
/// application config.
pub async fn connect(settings: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&settings.url, settings.max_connections, settings.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let timeout = Duration::from_secs(timeout_secs.max(1));

    // Foreign keys guard the conversation/message/escalation graph; the
    // busy timeout shares the configured budget with pool acquisition.
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(timeout);

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(timeout)
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use huddle_core::config::DatabaseConfig;

    use super::{connect, connect_with_settings};
    use crate::migrations;

    #[tokio::test]
    async fn connect_uses_the_database_section_of_the_config() {
        let settings = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 2,
            timeout_secs: 5,
        };

        let pool = connect(&settings).await.expect("connect");
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.expect("query");
        assert_eq!(one, 1);

        pool.close().await;
    }

    #[tokio::test]
    async fn every_connection_enforces_foreign_keys() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let orphan = sqlx::query(
            "INSERT INTO message
                 (id, conversation_id, sender_type, content, content_type, is_read, created_at)
             VALUES ('m-1', 'missing', 'employee', 'hi', 'text', 0, '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await;

        assert!(orphan.is_err(), "rows pointing at a missing conversation are rejected");
        pool.close().await;
    }
}
