use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tone::TonePreset;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

/// System-defined conversational personas. The set is fixed; companies
/// deploy instances of these, they never define new types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    PulseCheck,
    Onboarding,
    ExitInterview,
    ManagerCoaching,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PulseCheck => "pulse_check",
            Self::Onboarding => "onboarding",
            Self::ExitInterview => "exit_interview",
            Self::ManagerCoaching => "manager_coaching",
        }
    }

    /// Behavioral goal concatenated into the generation system prompt.
    pub fn goal(&self) -> &'static str {
        match self {
            Self::PulseCheck => {
                "Check in on how the employee is doing this week. Ask one open, specific \
                 question about workload, energy, or blockers. Listen more than you talk."
            }
            Self::Onboarding => {
                "Help a recently hired employee settle in. Ask about their first weeks, \
                 whether they have what they need, and who they have met so far."
            }
            Self::ExitInterview => {
                "Gather candid feedback from a departing employee. Ask what worked, what \
                 did not, and what one change would have made them stay."
            }
            Self::ManagerCoaching => {
                "Coach a people manager with short reflective prompts about their team: \
                 recognition given, feedback delivered, and upcoming 1:1 topics."
            }
        }
    }
}

impl std::str::FromStr for AgentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pulse_check" => Ok(Self::PulseCheck),
            "onboarding" => Ok(Self::Onboarding),
            "exit_interview" => Ok(Self::ExitInterview),
            "manager_coaching" => Ok(Self::ManagerCoaching),
            other => Err(format!("unknown agent type `{other}`")),
        }
    }
}

/// Immutable persona seed data. Never mutated by the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTemplate {
    pub id: TemplateId,
    pub name: String,
    pub agent_type: AgentType,
    pub goal: String,
}

/// Audience resolution rule for a deployed instance. Closed enum: unknown
/// audience kinds are rejected when the config blob is deserialized, not
/// deep inside the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudienceSelector {
    CompanyWide,
    Team { team_id: String },
    Explicit { employee_ids: Vec<EmployeeId> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub tone: TonePreset,
    pub audience: AudienceSelector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_hint: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Active,
    Archived,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl std::str::FromStr for InstanceStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown instance status `{other}`")),
        }
    }
}

/// A company's configured deployment of a template. Archived instances are
/// soft-deleted; runs against them are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInstance {
    pub id: InstanceId,
    pub company_id: String,
    pub template_id: TemplateId,
    pub agent_type: AgentType,
    pub name: String,
    pub config: InstanceConfig,
    pub status: InstanceStatus,
    pub created_at: DateTime<Utc>,
}

impl AgentInstance {
    pub fn is_active(&self) -> bool {
        self.status == InstanceStatus::Active
    }
}

/// Directory view of a participant, supplied by the persistence collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRef {
    pub id: EmployeeId,
    pub company_id: String,
    pub team_id: Option<String>,
    pub display_name: String,
    pub title: Option<String>,
    pub department: Option<String>,
}

impl EmployeeRef {
    /// One-line descriptor used in generation prompts.
    pub fn descriptor(&self) -> String {
        match (&self.title, &self.department) {
            (Some(title), Some(department)) => {
                format!("{} ({title}, {department})", self.display_name)
            }
            (Some(title), None) => format!("{} ({title})", self.display_name),
            (None, Some(department)) => format!("{} ({department})", self.display_name),
            (None, None) => self.display_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentType, AudienceSelector, EmployeeId, EmployeeRef};

    #[test]
    fn agent_type_round_trips_through_str() {
        for agent_type in [
            AgentType::PulseCheck,
            AgentType::Onboarding,
            AgentType::ExitInterview,
            AgentType::ManagerCoaching,
        ] {
            let parsed: AgentType = agent_type.as_str().parse().expect("parse agent type");
            assert_eq!(parsed, agent_type);
        }
    }

    #[test]
    fn unknown_audience_kind_is_rejected_at_the_boundary() {
        let result: Result<AudienceSelector, _> =
            serde_json::from_str(r#"{"kind":"everyone_and_their_dog"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn explicit_audience_deserializes_employee_ids() {
        let audience: AudienceSelector =
            serde_json::from_str(r#"{"kind":"explicit","employee_ids":["e-1","e-2"]}"#)
                .expect("valid audience");
        assert_eq!(
            audience,
            AudienceSelector::Explicit {
                employee_ids: vec![EmployeeId("e-1".to_string()), EmployeeId("e-2".to_string())]
            }
        );
    }

    #[test]
    fn descriptor_includes_title_and_department_when_present() {
        let employee = EmployeeRef {
            id: EmployeeId("e-1".to_string()),
            company_id: "c-1".to_string(),
            team_id: None,
            display_name: "Sam Rivera".to_string(),
            title: Some("Designer".to_string()),
            department: Some("Product".to_string()),
        };
        assert_eq!(employee.descriptor(), "Sam Rivera (Designer, Product)");
    }
}
