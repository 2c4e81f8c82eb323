use thiserror::Error;

use crate::domain::conversation::ConversationStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid conversation transition from {from:?} to {to:?}")]
    InvalidConversationTransition { from: ConversationStatus, to: ConversationStatus },
    #[error("conversation is closed and accepts no further messages")]
    ConversationClosed,
    #[error("conversation is escalated and waiting for human contact")]
    ConversationEscalated,
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Application-layer taxonomy surfaced by the orchestrator operations.
/// Model unavailability never appears here: the response generator absorbs
/// it into a fallback reply.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("agent instance {id} is not active")]
    InstanceNotActive { id: String },
    #[error("storage failure: {0}")]
    Storage(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "You do not have access to this resource.",
            Self::NotFound { .. } => "The requested resource does not exist.",
            Self::Conflict { .. } => {
                "The conversation is no longer accepting automated replies."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}

impl OrchestratorError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let message = self.to_string();

        match self {
            Self::Validation(_)
            | Self::Domain(DomainError::InvalidConversationTransition { .. })
            | Self::Domain(DomainError::InvariantViolation(_)) => {
                InterfaceError::BadRequest { message, correlation_id }
            }
            Self::Permission(_) => InterfaceError::Forbidden { message, correlation_id },
            Self::NotFound { .. } => InterfaceError::NotFound { message, correlation_id },
            Self::InstanceNotActive { .. }
            | Self::Domain(DomainError::ConversationClosed)
            | Self::Domain(DomainError::ConversationEscalated) => {
                InterfaceError::Conflict { message, correlation_id }
            }
            Self::Storage(_) => InterfaceError::ServiceUnavailable { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DomainError, InterfaceError, OrchestratorError};

    #[test]
    fn state_guard_violations_map_to_conflict() {
        let closed = OrchestratorError::from(DomainError::ConversationClosed)
            .into_interface("req-1");
        assert!(matches!(closed, InterfaceError::Conflict { .. }));
        assert_eq!(closed.correlation_id(), "req-1");

        let escalated = OrchestratorError::from(DomainError::ConversationEscalated)
            .into_interface("req-2");
        assert!(matches!(escalated, InterfaceError::Conflict { .. }));
    }

    #[test]
    fn permission_error_maps_to_forbidden() {
        let interface = OrchestratorError::Permission("not the participant".to_string())
            .into_interface("req-3");
        assert!(matches!(interface, InterfaceError::Forbidden { .. }));
        assert_eq!(interface.user_message(), "You do not have access to this resource.");
    }

    #[test]
    fn storage_error_maps_to_service_unavailable() {
        let interface =
            OrchestratorError::Storage("database lock timeout".to_string()).into_interface("req-4");
        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
    }

    #[test]
    fn not_found_carries_the_entity_kind() {
        let error = OrchestratorError::NotFound { kind: "conversation", id: "c-9".to_string() };
        assert_eq!(error.to_string(), "conversation not found: c-9");
        assert!(matches!(error.into_interface("req-5"), InterfaceError::NotFound { .. }));
    }
}
