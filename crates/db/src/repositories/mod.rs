use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use huddle_core::audit::AuditEvent;
use huddle_core::domain::agent::{
    AgentInstance, AgentTemplate, EmployeeId, EmployeeRef, InstanceId, TemplateId,
};
use huddle_core::domain::conversation::{
    Conversation, ConversationId, ConversationStatus, Message,
};
use huddle_core::domain::escalation::EscalationRecord;
use huddle_core::domain::schedule::{Schedule, ScheduleId};

pub mod audit;
pub mod conversation;
pub mod employee;
pub mod escalation;
pub mod instance;
pub mod memory;
pub mod schedule;

pub use audit::{SqlAuditEventStore, SqlAuditSink};
pub use conversation::SqlConversationRepository;
pub use employee::SqlEmployeeDirectory;
pub use escalation::SqlEscalationRepository;
pub use instance::SqlInstanceRepository;
pub use memory::{
    InMemoryConversationRepository, InMemoryEmployeeDirectory, InMemoryEscalationRepository,
    InMemoryInstanceRepository, InMemoryScheduleRepository,
};
pub use schedule::SqlScheduleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

#[async_trait]
pub trait InstanceRepository: Send + Sync {
    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<AgentInstance>, RepositoryError>;
    async fn save(&self, instance: AgentInstance) -> Result<(), RepositoryError>;
    async fn find_template(
        &self,
        id: &TemplateId,
    ) -> Result<Option<AgentTemplate>, RepositoryError>;
    async fn save_template(&self, template: AgentTemplate) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn find_by_id(&self, id: &ScheduleId) -> Result<Option<Schedule>, RepositoryError>;
    async fn find_by_instance(
        &self,
        instance_id: &InstanceId,
    ) -> Result<Option<Schedule>, RepositoryError>;
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>, RepositoryError>;
    async fn save(&self, schedule: Schedule) -> Result<(), RepositoryError>;
    async fn update_next_run(
        &self,
        id: &ScheduleId,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

/// Message appends and conversation counter bumps are one atomic write:
/// the SQL implementation uses a transaction, the in-memory one a single
/// write-lock scope.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// The Active conversation for an (instance, employee) pair, if any.
    /// The pair holds at most one by construction.
    async fn find_open_for_pair(
        &self,
        instance_id: &InstanceId,
        employee_id: &EmployeeId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// The most recent conversation for the pair regardless of status. Used
    /// by the run path to decide between reuse, skip, and create.
    async fn find_latest_for_pair(
        &self,
        instance_id: &InstanceId,
        employee_id: &EmployeeId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    async fn create(&self, conversation: Conversation) -> Result<(), RepositoryError>;

    async fn update_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), RepositoryError>;

    /// Inserts the message and bumps message_count and last_message_at.
    async fn append_employee_message(&self, message: Message) -> Result<(), RepositoryError>;

    /// Inserts the message and bumps message_count, unread_count and
    /// last_message_at.
    async fn append_agent_message(&self, message: Message) -> Result<(), RepositoryError>;

    /// Last `limit` messages in chronological order, oldest first.
    async fn list_recent_messages(
        &self,
        id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError>;
}

#[async_trait]
pub trait EscalationRepository: Send + Sync {
    async fn create(&self, record: EscalationRecord) -> Result<(), RepositoryError>;
    async fn find_open_for_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<EscalationRecord>, RepositoryError>;
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<EmployeeRef>, RepositoryError>;
    async fn list_company(&self, company_id: &str) -> Result<Vec<EmployeeRef>, RepositoryError>;
    async fn list_team(
        &self,
        company_id: &str,
        team_id: &str,
    ) -> Result<Vec<EmployeeRef>, RepositoryError>;
    async fn save(&self, employee: EmployeeRef) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AuditEventStore: Send + Sync {
    async fn append(&self, event: AuditEvent) -> Result<(), RepositoryError>;
}

pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|error| RepositoryError::decode(format!("bad timestamp `{raw}`: {error}")))
}
