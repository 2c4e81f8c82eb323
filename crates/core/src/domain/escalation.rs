use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::conversation::{ConversationId, MessageId};
use crate::safety::SafetyCategory;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscalationId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationType {
    Safety,
    Harassment,
    Discrimination,
    Urgent,
}

impl EscalationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Harassment => "harassment",
            Self::Discrimination => "discrimination",
            Self::Urgent => "urgent",
        }
    }
}

impl std::str::FromStr for EscalationType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "safety" => Ok(Self::Safety),
            "harassment" => Ok(Self::Harassment),
            "discrimination" => Ok(Self::Discrimination),
            "urgent" => Ok(Self::Urgent),
            other => Err(format!("unknown escalation type `{other}`")),
        }
    }
}

impl From<SafetyCategory> for EscalationType {
    fn from(category: SafetyCategory) -> Self {
        match category {
            SafetyCategory::Safety => Self::Safety,
            SafetyCategory::Harassment => Self::Harassment,
            SafetyCategory::Discrimination => Self::Discrimination,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationSeverity {
    High,
    Critical,
}

impl EscalationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Self-harm concerns are always critical; hostile-conduct concerns are
    /// routed high.
    pub fn for_category(category: SafetyCategory) -> Self {
        match category {
            SafetyCategory::Safety => Self::Critical,
            SafetyCategory::Harassment | SafetyCategory::Discrimination => Self::High,
        }
    }
}

impl std::str::FromStr for EscalationSeverity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown escalation severity `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    Open,
    Closed,
}

impl EscalationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::str::FromStr for EscalationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown escalation status `{other}`")),
        }
    }
}

/// Created exactly once per triggering inbound message. A conversation holds
/// at most one open record at a time; closing it is a human action outside
/// this core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub id: EscalationId,
    pub conversation_id: ConversationId,
    pub trigger_message_id: MessageId,
    pub escalation_type: EscalationType,
    pub severity: EscalationSeverity,
    pub description: String,
    pub status: EscalationStatus,
    pub created_at: DateTime<Utc>,
}

impl EscalationRecord {
    pub fn for_flagged_message(
        conversation_id: ConversationId,
        trigger_message_id: MessageId,
        category: SafetyCategory,
        matched_term: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EscalationId(Uuid::new_v4().to_string()),
            conversation_id,
            trigger_message_id,
            escalation_type: category.into(),
            severity: EscalationSeverity::for_category(category),
            description: format!(
                "inbound message flagged for {} (matched term: `{matched_term}`)",
                EscalationType::from(category).as_str()
            ),
            status: EscalationStatus::Open,
            created_at: now,
        }
    }
}
