pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod identity;
pub mod lifecycle;
pub mod safety;
pub mod scheduler;
pub mod tone;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use domain::agent::{
    AgentInstance, AgentTemplate, AgentType, AudienceSelector, EmployeeId, EmployeeRef,
    InstanceConfig, InstanceId, InstanceStatus, TemplateId,
};
pub use domain::conversation::{
    ContentType, Conversation, ConversationId, ConversationStatus, Message, MessageId, SenderType,
};
pub use domain::escalation::{
    EscalationId, EscalationRecord, EscalationSeverity, EscalationStatus, EscalationType,
};
pub use domain::schedule::{Cadence, Schedule, ScheduleId};
pub use errors::{DomainError, InterfaceError, OrchestratorError};
pub use identity::RequestContext;
pub use lifecycle::{LifecycleEngine, LifecycleEvent, TransitionError, TransitionOutcome};
pub use safety::{SafetyCategory, SafetyClassifier, SafetyLexicon, SafetyVerdict};
pub use scheduler::{NextRun, Scheduler};
pub use tone::TonePreset;
