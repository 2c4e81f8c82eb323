use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::{EmployeeId, InstanceId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Escalated,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Escalated => "escalated",
            Self::Closed => "closed",
        }
    }
}

impl std::str::FromStr for ConversationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "escalated" => Ok(Self::Escalated),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown conversation status `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Agent,
    Employee,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Employee => "employee",
        }
    }
}

impl std::str::FromStr for SenderType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "agent" => Ok(Self::Agent),
            "employee" => Ok(Self::Employee),
            other => Err(format!("unknown sender type `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Escalation,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Escalation => "escalation",
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "escalation" => Ok(Self::Escalation),
            other => Err(format!("unknown content type `{other}`")),
        }
    }
}

/// One thread between an agent instance and one employee. Terminal states
/// are Closed and Escalated; neither returns to Active through this core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub instance_id: InstanceId,
    pub employee_id: EmployeeId,
    pub status: ConversationStatus,
    pub message_count: u32,
    pub unread_count: u32,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn open(instance_id: InstanceId, employee_id: EmployeeId, now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId(Uuid::new_v4().to_string()),
            instance_id,
            employee_id,
            status: ConversationStatus::Active,
            message_count: 0,
            unread_count: 0,
            last_message_at: None,
            created_at: now,
        }
    }

    pub fn can_transition_to(&self, next: ConversationStatus) -> bool {
        matches!(
            (self.status, next),
            (ConversationStatus::Active, ConversationStatus::Escalated)
                | (ConversationStatus::Active, ConversationStatus::Closed)
        )
    }

    pub fn transition_to(&mut self, next: ConversationStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidConversationTransition { from: self.status, to: next })
    }
}

/// Append-only log entry. Never edited after creation, only marked read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_type: SenderType,
    pub content: String,
    pub content_type: ContentType,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn from_employee(
        conversation_id: ConversationId,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId(Uuid::new_v4().to_string()),
            conversation_id,
            sender_type: SenderType::Employee,
            content: content.into(),
            content_type: ContentType::Text,
            is_read: false,
            created_at: now,
        }
    }

    pub fn from_agent(
        conversation_id: ConversationId,
        content: impl Into<String>,
        content_type: ContentType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId(Uuid::new_v4().to_string()),
            conversation_id,
            sender_type: SenderType::Agent,
            content: content.into(),
            content_type,
            is_read: false,
            created_at: now,
        }
    }
}
