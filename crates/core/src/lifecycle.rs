//! Conversation lifecycle engine.
//!
//! Owns the legal transitions of a single conversation and pairs every
//! applied or rejected transition with the audit event the persistence
//! collaborator expects.

use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::conversation::ConversationStatus;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A safety-critical inbound message was detected.
    ConcernRaised,
    /// The thread ran its course and is being retired.
    CloseRequested,
}

impl LifecycleEvent {
    fn action_name(&self) -> &'static str {
        match self {
            Self::ConcernRaised => "conversation.escalated",
            Self::CloseRequested => "conversation.closed",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {status:?} using event {event:?}")]
    InvalidTransition { status: ConversationStatus, event: LifecycleEvent },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: ConversationStatus,
    pub to: ConversationStatus,
    pub event: LifecycleEvent,
}

#[derive(Clone, Debug, Default)]
pub struct LifecycleEngine;

impl LifecycleEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_status(&self) -> ConversationStatus {
        ConversationStatus::Active
    }

    /// Escalated and Closed are terminal from the orchestrator's point of
    /// view; only the human-facing collaborator moves a conversation out of
    /// Escalated, and it never comes back through this engine.
    pub fn apply(
        &self,
        current: ConversationStatus,
        event: &LifecycleEvent,
    ) -> Result<TransitionOutcome, TransitionError> {
        let to = match (current, event) {
            (ConversationStatus::Active, LifecycleEvent::ConcernRaised) => {
                ConversationStatus::Escalated
            }
            (ConversationStatus::Active, LifecycleEvent::CloseRequested) => {
                ConversationStatus::Closed
            }
            _ => {
                return Err(TransitionError::InvalidTransition {
                    status: current,
                    event: event.clone(),
                });
            }
        };

        Ok(TransitionOutcome { from: current, to, event: event.clone() })
    }

    pub fn apply_with_audit<S>(
        &self,
        current: ConversationStatus,
        event: &LifecycleEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, TransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.conversation_id.clone(),
                        audit.run_id.clone(),
                        audit.correlation_id.clone(),
                        event.action_name(),
                        AuditCategory::Conversation,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("target_type", "conversation")
                    .with_metadata("before", outcome.from.as_str())
                    .with_metadata("after", outcome.to.as_str()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.conversation_id.clone(),
                        audit.run_id.clone(),
                        audit.correlation_id.clone(),
                        "conversation.transition_rejected",
                        AuditCategory::Conversation,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("target_type", "conversation")
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{LifecycleEngine, LifecycleEvent, TransitionError};
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::conversation::ConversationId;
    use crate::domain::conversation::ConversationStatus;

    #[test]
    fn active_escalates_on_concern() {
        let engine = LifecycleEngine::new();
        let outcome = engine
            .apply(ConversationStatus::Active, &LifecycleEvent::ConcernRaised)
            .expect("active -> escalated");
        assert_eq!(outcome.to, ConversationStatus::Escalated);
    }

    #[test]
    fn terminal_states_reject_every_event() {
        let engine = LifecycleEngine::new();
        for status in [ConversationStatus::Escalated, ConversationStatus::Closed] {
            for event in [LifecycleEvent::ConcernRaised, LifecycleEvent::CloseRequested] {
                let error = engine.apply(status, &event).expect_err("terminal state");
                assert!(matches!(error, TransitionError::InvalidTransition { .. }));
            }
        }
    }

    #[test]
    fn applied_transition_emits_before_and_after_status() {
        let engine = LifecycleEngine::new();
        let sink = InMemoryAuditSink::default();

        engine
            .apply_with_audit(
                ConversationStatus::Active,
                &LifecycleEvent::ConcernRaised,
                &sink,
                &AuditContext::new(
                    Some(ConversationId("c-1".to_string())),
                    None,
                    "req-9",
                    "orchestrator",
                ),
            )
            .expect("transition applies");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "conversation.escalated");
        assert_eq!(events[0].metadata.get("before").map(String::as_str), Some("active"));
        assert_eq!(events[0].metadata.get("after").map(String::as_str), Some("escalated"));
    }

    #[test]
    fn rejected_transition_is_audited_as_rejected() {
        let engine = LifecycleEngine::new();
        let sink = InMemoryAuditSink::default();

        let _ = engine.apply_with_audit(
            ConversationStatus::Closed,
            &LifecycleEvent::ConcernRaised,
            &sink,
            &AuditContext::new(None, None, "req-10", "orchestrator"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "conversation.transition_rejected");
    }
}
