use chrono::{DateTime, Utc};
use sqlx::Row;

use huddle_core::domain::agent::InstanceId;
use huddle_core::domain::schedule::{Schedule, ScheduleId};

use super::{format_ts, parse_ts, RepositoryError, ScheduleRepository};
use crate::DbPool;

pub struct SqlScheduleRepository {
    pool: DbPool,
}

impl SqlScheduleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn schedule_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Schedule, RepositoryError> {
    Ok(Schedule {
        id: ScheduleId(row.get("id")),
        instance_id: InstanceId(row.get("instance_id")),
        cadence: row.get("cadence"),
        cron: row.get("cron"),
        timezone: row.get("timezone"),
        next_run_at: parse_ts(&row.get::<String, _>("next_run_at"))?,
        is_active: row.get::<i64, _>("is_active") != 0,
    })
}

#[async_trait::async_trait]
impl ScheduleRepository for SqlScheduleRepository {
    async fn find_by_id(&self, id: &ScheduleId) -> Result<Option<Schedule>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, instance_id, cadence, cron, timezone, next_run_at, is_active
             FROM schedule WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(schedule_from_row).transpose()
    }

    async fn find_by_instance(
        &self,
        instance_id: &InstanceId,
    ) -> Result<Option<Schedule>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, instance_id, cadence, cron, timezone, next_run_at, is_active
             FROM schedule WHERE instance_id = ?",
        )
        .bind(&instance_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(schedule_from_row).transpose()
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, instance_id, cadence, cron, timezone, next_run_at, is_active
             FROM schedule
             WHERE is_active = 1 AND next_run_at <= ?
             ORDER BY next_run_at ASC",
        )
        .bind(format_ts(now))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(schedule_from_row).collect()
    }

    async fn save(&self, schedule: Schedule) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO schedule (id, instance_id, cadence, cron, timezone, next_run_at, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                 cadence = excluded.cadence,
                 cron = excluded.cron,
                 timezone = excluded.timezone,
                 next_run_at = excluded.next_run_at,
                 is_active = excluded.is_active",
        )
        .bind(&schedule.id.0)
        .bind(&schedule.instance_id.0)
        .bind(&schedule.cadence)
        .bind(&schedule.cron)
        .bind(&schedule.timezone)
        .bind(format_ts(schedule.next_run_at))
        .bind(i64::from(schedule.is_active))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_next_run(
        &self,
        id: &ScheduleId,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE schedule SET next_run_at = ? WHERE id = ?")
            .bind(format_ts(next_run_at))
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
