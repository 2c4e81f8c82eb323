use sqlx::Row;

use huddle_core::domain::agent::{
    AgentInstance, AgentTemplate, AgentType, InstanceConfig, InstanceId, InstanceStatus,
    TemplateId,
};

use super::{format_ts, parse_ts, InstanceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlInstanceRepository {
    pool: DbPool,
}

impl SqlInstanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn instance_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<AgentInstance, RepositoryError> {
    let agent_type_raw = row.get::<String, _>("agent_type");
    let agent_type =
        agent_type_raw.parse::<AgentType>().map_err(RepositoryError::decode)?;

    let status_raw = row.get::<String, _>("status");
    let status = status_raw.parse::<InstanceStatus>().map_err(RepositoryError::decode)?;

    let config_raw = row.get::<String, _>("config_json");
    let config: InstanceConfig = serde_json::from_str(&config_raw)
        .map_err(|error| RepositoryError::decode(format!("bad instance config: {error}")))?;

    Ok(AgentInstance {
        id: InstanceId(row.get("id")),
        company_id: row.get("company_id"),
        template_id: TemplateId(row.get("template_id")),
        agent_type,
        name: row.get("name"),
        config,
        status,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
    })
}

#[async_trait::async_trait]
impl InstanceRepository for SqlInstanceRepository {
    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<AgentInstance>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, company_id, template_id, agent_type, name, status, config_json, created_at
             FROM agent_instance WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(instance_from_row).transpose()
    }

    async fn save(&self, instance: AgentInstance) -> Result<(), RepositoryError> {
        let config_json = serde_json::to_string(&instance.config)
            .map_err(|error| RepositoryError::decode(format!("bad instance config: {error}")))?;

        sqlx::query(
            "INSERT INTO agent_instance
                 (id, company_id, template_id, agent_type, name, status, config_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                 company_id = excluded.company_id,
                 template_id = excluded.template_id,
                 agent_type = excluded.agent_type,
                 name = excluded.name,
                 status = excluded.status,
                 config_json = excluded.config_json",
        )
        .bind(&instance.id.0)
        .bind(&instance.company_id)
        .bind(&instance.template_id.0)
        .bind(instance.agent_type.as_str())
        .bind(&instance.name)
        .bind(instance.status.as_str())
        .bind(config_json)
        .bind(format_ts(instance.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_template(
        &self,
        id: &TemplateId,
    ) -> Result<Option<AgentTemplate>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, agent_type, goal FROM agent_template WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let agent_type = row
                .get::<String, _>("agent_type")
                .parse::<AgentType>()
                .map_err(RepositoryError::decode)?;
            Ok(AgentTemplate {
                id: TemplateId(row.get("id")),
                name: row.get("name"),
                agent_type,
                goal: row.get("goal"),
            })
        })
        .transpose()
    }

    async fn save_template(&self, template: AgentTemplate) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO agent_template (id, name, agent_type, goal)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                 name = excluded.name,
                 agent_type = excluded.agent_type,
                 goal = excluded.goal",
        )
        .bind(&template.id.0)
        .bind(&template.name)
        .bind(template.agent_type.as_str())
        .bind(&template.goal)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
