use sqlx::Row;

use huddle_core::domain::agent::{EmployeeId, EmployeeRef};

use super::{EmployeeDirectory, RepositoryError};
use crate::DbPool;

pub struct SqlEmployeeDirectory {
    pool: DbPool,
}

impl SqlEmployeeDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn employee_from_row(row: &sqlx::sqlite::SqliteRow) -> EmployeeRef {
    EmployeeRef {
        id: EmployeeId(row.get("id")),
        company_id: row.get("company_id"),
        team_id: row.get("team_id"),
        display_name: row.get("display_name"),
        title: row.get("title"),
        department: row.get("department"),
    }
}

#[async_trait::async_trait]
impl EmployeeDirectory for SqlEmployeeDirectory {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<EmployeeRef>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, company_id, team_id, display_name, title, department
             FROM employee WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(employee_from_row))
    }

    async fn list_company(&self, company_id: &str) -> Result<Vec<EmployeeRef>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, company_id, team_id, display_name, title, department
             FROM employee WHERE company_id = ? ORDER BY id ASC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(employee_from_row).collect())
    }

    async fn list_team(
        &self,
        company_id: &str,
        team_id: &str,
    ) -> Result<Vec<EmployeeRef>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, company_id, team_id, display_name, title, department
             FROM employee WHERE company_id = ? AND team_id = ? ORDER BY id ASC",
        )
        .bind(company_id)
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(employee_from_row).collect())
    }

    async fn save(&self, employee: EmployeeRef) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO employee (id, company_id, team_id, display_name, title, department)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                 company_id = excluded.company_id,
                 team_id = excluded.team_id,
                 display_name = excluded.display_name,
                 title = excluded.title,
                 department = excluded.department",
        )
        .bind(&employee.id.0)
        .bind(&employee.company_id)
        .bind(&employee.team_id)
        .bind(&employee.display_name)
        .bind(&employee.title)
        .bind(&employee.department)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
