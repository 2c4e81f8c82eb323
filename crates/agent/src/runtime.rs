//! Run and reply orchestration.
//!
//! Owns authorization, audience resolution, per-pair locking, safety
//! handling, and schedule advancement. Everything stateful goes through the
//! repository traits so the whole flow is testable in memory.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};
use uuid::Uuid;

use huddle_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use huddle_core::domain::agent::{AgentInstance, AudienceSelector, EmployeeId, EmployeeRef, InstanceId};
use huddle_core::domain::conversation::{
    ContentType, Conversation, ConversationId, ConversationStatus, Message, SenderType,
};
use huddle_core::domain::escalation::EscalationRecord;
use huddle_core::errors::{DomainError, OrchestratorError};
use huddle_core::identity::RequestContext;
use huddle_core::lifecycle::{LifecycleEngine, LifecycleEvent};
use huddle_core::safety::{SafetyCategory, SafetyClassifier};
use huddle_core::scheduler::Scheduler;
use huddle_db::repositories::{
    ConversationRepository, EmployeeDirectory, EscalationRepository, InstanceRepository,
    RepositoryError, ScheduleRepository,
};

use crate::generator::ResponseGenerator;
use crate::llm::ChatTurn;
use crate::locks::ConversationLocks;

/// Newest messages handed to the model as context.
const HISTORY_WINDOW: u32 = 10;

const SCHEDULER_ACTOR: &str = "scheduler";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerKind {
    /// Admin-initiated via the API or CLI.
    Manual,
    /// Initiated by the due-schedule driver; advances the schedule.
    Scheduled,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunFailure {
    pub employee_id: EmployeeId,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    pub run_id: String,
    pub instance_id: InstanceId,
    pub messages_sent: u32,
    pub conversations_created: u32,
    pub failures: Vec<RunFailure>,
    /// Set when a scheduled run advanced the schedule.
    pub next_run_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyOutcome {
    pub conversation_id: ConversationId,
    pub agent_message: Message,
    pub escalated: bool,
    pub degraded: bool,
}

pub struct Orchestrator {
    instances: Arc<dyn InstanceRepository>,
    schedules: Arc<dyn ScheduleRepository>,
    conversations: Arc<dyn ConversationRepository>,
    escalations: Arc<dyn EscalationRepository>,
    directory: Arc<dyn EmployeeDirectory>,
    generator: ResponseGenerator,
    classifier: SafetyClassifier,
    scheduler: Scheduler,
    lifecycle: LifecycleEngine,
    audit: Arc<dyn AuditSink>,
    locks: ConversationLocks,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instances: Arc<dyn InstanceRepository>,
        schedules: Arc<dyn ScheduleRepository>,
        conversations: Arc<dyn ConversationRepository>,
        escalations: Arc<dyn EscalationRepository>,
        directory: Arc<dyn EmployeeDirectory>,
        generator: ResponseGenerator,
        classifier: SafetyClassifier,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            instances,
            schedules,
            conversations,
            escalations,
            directory,
            generator,
            classifier,
            scheduler: Scheduler::new(),
            lifecycle: LifecycleEngine::new(),
            audit,
            locks: ConversationLocks::default(),
        }
    }

    /// Runs one check-in round for an instance: resolves the audience and
    /// sends (or follows up in) one conversation per employee. Per-employee
    /// trouble is collected as failures, never aborting the round.
    ///
    /// A manual trigger may narrow the round to an explicit `targets` list;
    /// otherwise the instance's configured audience is used.
    pub async fn trigger_run(
        &self,
        ctx: &RequestContext,
        instance_id: &InstanceId,
        kind: TriggerKind,
        targets: Option<&[EmployeeId]>,
        now: DateTime<Utc>,
    ) -> Result<RunResult, OrchestratorError> {
        let instance = self
            .instances
            .find_by_id(instance_id)
            .await
            .map_err(storage)?
            .ok_or_else(|| OrchestratorError::NotFound {
                kind: "agent instance",
                id: instance_id.0.clone(),
            })?;

        if instance.company_id != ctx.company_id {
            return Err(OrchestratorError::Permission(
                "agent instance belongs to another company".to_string(),
            ));
        }
        if kind == TriggerKind::Manual && !ctx.is_admin {
            return Err(OrchestratorError::Permission(
                "manual runs require an admin".to_string(),
            ));
        }
        if !instance.is_active() {
            return Err(OrchestratorError::InstanceNotActive { id: instance_id.0.clone() });
        }

        let run_id = Uuid::new_v4().to_string();
        let actor = match kind {
            TriggerKind::Manual => ctx.user_id.clone(),
            TriggerKind::Scheduled => SCHEDULER_ACTOR.to_string(),
        };

        let (audience, mut failures) = match targets {
            Some(employee_ids) => self.resolve_explicit(&instance, employee_ids).await?,
            None => self.resolve_audience(&instance).await?,
        };
        let goal = self.prompt_goal(&instance).await?;

        self.audit.emit(
            AuditEvent::new(
                None,
                Some(run_id.clone()),
                run_id.clone(),
                "run.started",
                AuditCategory::Scheduling,
                actor.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("instance_id", &instance.id.0)
            .with_metadata("trigger", kind.as_str())
            .with_metadata("audience_size", audience.len().to_string()),
        );

        let mut messages_sent = 0u32;
        let mut conversations_created = 0u32;

        for employee in &audience {
            let key = ConversationLocks::pair_key(&instance.id.0, &employee.id.0);
            let _guard = self.locks.acquire(&key).await;

            match self.run_for_employee(&instance, employee, &goal, &run_id, &actor, now).await {
                Ok(created) => {
                    messages_sent += 1;
                    if created {
                        conversations_created += 1;
                    }
                }
                Err(reason) => {
                    failures.push(RunFailure { employee_id: employee.id.clone(), reason });
                }
            }
        }

        let next_run_at = if kind == TriggerKind::Scheduled {
            self.advance_schedule(instance_id, &run_id, &actor, now).await?
        } else {
            None
        };

        self.audit.emit(
            AuditEvent::new(
                None,
                Some(run_id.clone()),
                run_id.clone(),
                "run.completed",
                AuditCategory::Scheduling,
                actor,
                AuditOutcome::Success,
            )
            .with_metadata("instance_id", &instance.id.0)
            .with_metadata("messages_sent", messages_sent.to_string())
            .with_metadata("failures", failures.len().to_string()),
        );

        info!(
            run_id = %run_id,
            instance_id = %instance.id.0,
            messages_sent,
            failures = failures.len(),
            "check-in run completed"
        );

        Ok(RunResult {
            run_id,
            instance_id: instance_id.clone(),
            messages_sent,
            conversations_created,
            failures,
            next_run_at,
        })
    }

    /// Triggers every due schedule. The driver calling this owns the polling
    /// interval; per-instance errors are logged and skipped.
    pub async fn run_due(&self, now: DateTime<Utc>) -> Result<Vec<RunResult>, OrchestratorError> {
        let due = self.schedules.list_due(now).await.map_err(storage)?;
        let mut results = Vec::with_capacity(due.len());

        for schedule in due {
            let instance = match self.instances.find_by_id(&schedule.instance_id).await {
                Ok(Some(instance)) => instance,
                Ok(None) => {
                    warn!(instance_id = %schedule.instance_id.0, "due schedule without instance");
                    continue;
                }
                Err(error) => {
                    warn!(instance_id = %schedule.instance_id.0, %error, "skipping due schedule");
                    continue;
                }
            };

            let ctx = RequestContext {
                user_id: SCHEDULER_ACTOR.to_string(),
                company_id: instance.company_id.clone(),
                role: "system".to_string(),
                is_admin: true,
            };

            match self
                .trigger_run(&ctx, &schedule.instance_id, TriggerKind::Scheduled, None, now)
                .await
            {
                Ok(result) => results.push(result),
                Err(error) => {
                    warn!(instance_id = %schedule.instance_id.0, %error, "scheduled run failed");
                }
            }
        }

        Ok(results)
    }

    /// Handles one inbound employee message: guard the state machine, append
    /// the message, classify it, then either escalate or reply.
    pub async fn handle_employee_reply(
        &self,
        ctx: &RequestContext,
        conversation_id: &ConversationId,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<ReplyOutcome, OrchestratorError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(OrchestratorError::Validation(
                "reply content must not be empty".to_string(),
            ));
        }

        let conversation = self.find_conversation(conversation_id).await?;
        if conversation.employee_id.0 != ctx.user_id {
            return Err(OrchestratorError::Permission(
                "only the conversation participant may reply".to_string(),
            ));
        }

        let instance = self
            .instances
            .find_by_id(&conversation.instance_id)
            .await
            .map_err(storage)?
            .ok_or_else(|| OrchestratorError::NotFound {
                kind: "agent instance",
                id: conversation.instance_id.0.clone(),
            })?;
        if instance.company_id != ctx.company_id {
            return Err(OrchestratorError::Permission(
                "conversation belongs to another company".to_string(),
            ));
        }

        let key = ConversationLocks::pair_key(&instance.id.0, &conversation.employee_id.0);
        let _guard = self.locks.acquire(&key).await;

        // Re-read under the lock: a concurrent reply may have escalated or
        // closed the thread since the first read.
        let conversation = self.find_conversation(conversation_id).await?;
        match conversation.status {
            ConversationStatus::Closed => {
                return Err(DomainError::ConversationClosed.into());
            }
            ConversationStatus::Escalated => {
                return Err(DomainError::ConversationEscalated.into());
            }
            ConversationStatus::Active => {}
        }

        let inbound = Message::from_employee(conversation.id.clone(), content, now);
        self.conversations.append_employee_message(inbound.clone()).await.map_err(storage)?;

        let correlation_id = Uuid::new_v4().to_string();
        let verdict = self.classifier.classify(content);
        if let (Some(category), Some(matched_term)) = (verdict.category, verdict.matched_term) {
            return self
                .escalate(
                    &ctx.user_id,
                    &conversation,
                    &inbound,
                    category,
                    &matched_term,
                    &correlation_id,
                    now,
                )
                .await;
        }

        let employee = self
            .directory
            .find_by_id(&conversation.employee_id)
            .await
            .map_err(storage)?
            .ok_or_else(|| OrchestratorError::NotFound {
                kind: "employee",
                id: conversation.employee_id.0.clone(),
            })?;

        let goal = self.prompt_goal(&instance).await?;
        let history = self.recent_turns(&conversation.id).await?;
        let reply = self.generator.generate(&instance, &employee, &goal, &history).await;

        let agent_message =
            Message::from_agent(conversation.id.clone(), reply.content, ContentType::Text, now);
        self.conversations.append_agent_message(agent_message.clone()).await.map_err(storage)?;

        self.audit.emit(
            AuditEvent::new(
                Some(conversation.id.clone()),
                None,
                correlation_id,
                "reply.generated",
                AuditCategory::Generation,
                ctx.user_id.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("degraded", reply.degraded.to_string()),
        );

        Ok(ReplyOutcome {
            conversation_id: conversation.id,
            agent_message,
            escalated: false,
            degraded: reply.degraded,
        })
    }

    async fn run_for_employee(
        &self,
        instance: &AgentInstance,
        employee: &EmployeeRef,
        goal: &str,
        run_id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, String> {
        let latest = self
            .conversations
            .find_latest_for_pair(&instance.id, &employee.id)
            .await
            .map_err(|error| error.to_string())?;

        let (conversation, created) = match latest {
            Some(conversation) if conversation.status == ConversationStatus::Active => {
                (conversation, false)
            }
            Some(conversation) if conversation.status == ConversationStatus::Escalated => {
                return Err("conversation is escalated and awaiting human follow-up".to_string());
            }
            _ => {
                let conversation = Conversation::open(instance.id.clone(), employee.id.clone(), now);
                self.conversations
                    .create(conversation.clone())
                    .await
                    .map_err(|error| error.to_string())?;

                self.audit.emit(
                    AuditEvent::new(
                        Some(conversation.id.clone()),
                        Some(run_id.to_string()),
                        run_id.to_string(),
                        "conversation.created",
                        AuditCategory::Conversation,
                        actor.to_string(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("employee_id", &employee.id.0),
                );

                (conversation, true)
            }
        };

        let (history, last_inbound) = if created {
            (Vec::new(), None)
        } else {
            let messages = self
                .conversations
                .list_recent_messages(&conversation.id, HISTORY_WINDOW)
                .await
                .map_err(|error| error.to_string())?;
            let last_inbound = messages
                .iter()
                .rev()
                .find(|message| message.sender_type == SenderType::Employee)
                .cloned();
            (turns_from(&messages), last_inbound)
        };

        let reply = self.generator.generate(instance, employee, goal, &history).await;

        // A flagged last turn means an earlier escalation never landed (for
        // example a crash between the append and the status change). Finish
        // it now instead of sending the empathetic copy as a plain follow-up.
        if let Some(concern) = &reply.flagged {
            let inbound = last_inbound
                .ok_or_else(|| "flagged reply without an inbound message".to_string())?;
            self.escalate(
                actor,
                &conversation,
                &inbound,
                concern.category,
                &concern.matched_term,
                run_id,
                now,
            )
            .await
            .map_err(|error| error.to_string())?;
            return Ok(created);
        }

        let agent_message =
            Message::from_agent(conversation.id.clone(), reply.content, ContentType::Text, now);
        self.conversations
            .append_agent_message(agent_message)
            .await
            .map_err(|error| error.to_string())?;

        Ok(created)
    }

    async fn escalate(
        &self,
        actor: &str,
        conversation: &Conversation,
        inbound: &Message,
        category: SafetyCategory,
        matched_term: &str,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ReplyOutcome, OrchestratorError> {
        // At most one open escalation per conversation; a repeat concern on
        // a thread that somehow re-activated reuses the open record.
        let existing = self
            .escalations
            .find_open_for_conversation(&conversation.id)
            .await
            .map_err(storage)?;
        if existing.is_none() {
            let record = EscalationRecord::for_flagged_message(
                conversation.id.clone(),
                inbound.id.clone(),
                category,
                matched_term,
                now,
            );
            self.audit.emit(
                AuditEvent::new(
                    Some(conversation.id.clone()),
                    None,
                    correlation_id.to_string(),
                    "escalation.recorded",
                    AuditCategory::Escalation,
                    actor.to_string(),
                    AuditOutcome::Success,
                )
                .with_metadata("category", category.as_str())
                .with_metadata("severity", record.severity.as_str())
                .with_metadata("matched_term", matched_term),
            );
            self.escalations.create(record).await.map_err(storage)?;
        }

        let audit_ctx = AuditContext::new(
            Some(conversation.id.clone()),
            None,
            correlation_id,
            actor.to_string(),
        );
        let outcome = self
            .lifecycle
            .apply_with_audit(
                conversation.status,
                &LifecycleEvent::ConcernRaised,
                self.audit.as_ref(),
                &audit_ctx,
            )
            .map_err(|_| DomainError::InvalidConversationTransition {
                from: conversation.status,
                to: ConversationStatus::Escalated,
            })?;
        self.conversations
            .update_status(&conversation.id, outcome.to)
            .await
            .map_err(storage)?;

        let agent_message = Message::from_agent(
            conversation.id.clone(),
            category.empathetic_reply(),
            ContentType::Escalation,
            now,
        );
        self.conversations.append_agent_message(agent_message.clone()).await.map_err(storage)?;

        Ok(ReplyOutcome {
            conversation_id: conversation.id.clone(),
            agent_message,
            escalated: true,
            degraded: false,
        })
    }

    async fn resolve_audience(
        &self,
        instance: &AgentInstance,
    ) -> Result<(Vec<EmployeeRef>, Vec<RunFailure>), OrchestratorError> {
        match &instance.config.audience {
            AudienceSelector::CompanyWide => {
                let listed =
                    self.directory.list_company(&instance.company_id).await.map_err(storage)?;
                Ok((listed, Vec::new()))
            }
            AudienceSelector::Team { team_id } => {
                let listed = self
                    .directory
                    .list_team(&instance.company_id, team_id)
                    .await
                    .map_err(storage)?;
                Ok((listed, Vec::new()))
            }
            AudienceSelector::Explicit { employee_ids } => {
                self.resolve_explicit(instance, employee_ids).await
            }
        }
    }

    async fn resolve_explicit(
        &self,
        instance: &AgentInstance,
        employee_ids: &[EmployeeId],
    ) -> Result<(Vec<EmployeeRef>, Vec<RunFailure>), OrchestratorError> {
        let mut listed = Vec::with_capacity(employee_ids.len());
        let mut failures = Vec::new();
        for employee_id in employee_ids {
            match self.directory.find_by_id(employee_id).await.map_err(storage)? {
                Some(employee) if employee.company_id == instance.company_id => {
                    listed.push(employee);
                }
                Some(_) | None => failures.push(RunFailure {
                    employee_id: employee_id.clone(),
                    reason: "employee not found in company directory".to_string(),
                }),
            }
        }
        Ok((listed, failures))
    }

    async fn advance_schedule(
        &self,
        instance_id: &InstanceId,
        run_id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, OrchestratorError> {
        let Some(schedule) =
            self.schedules.find_by_instance(instance_id).await.map_err(storage)?
        else {
            return Ok(None);
        };

        let tz = schedule.timezone.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                schedule_id = %schedule.id.0,
                timezone = %schedule.timezone,
                "unknown timezone, computing next run in UTC"
            );
            chrono_tz::UTC
        });

        let next = self.scheduler.next_run_raw(&schedule.cadence, now, tz);
        if next.fallback_applied {
            warn!(
                schedule_id = %schedule.id.0,
                cadence = %schedule.cadence,
                "unknown cadence, applying seven-day fallback"
            );
        }
        self.schedules.update_next_run(&schedule.id, next.at).await.map_err(storage)?;

        self.audit.emit(
            AuditEvent::new(
                None,
                Some(run_id.to_string()),
                run_id.to_string(),
                "schedule.advanced",
                AuditCategory::Scheduling,
                actor.to_string(),
                AuditOutcome::Success,
            )
            .with_metadata("schedule_id", &schedule.id.0)
            .with_metadata("next_run_at", next.at.to_rfc3339())
            .with_metadata("fallback_applied", next.fallback_applied.to_string()),
        );

        Ok(Some(next.at))
    }

    /// The stored template customizes the prompt goal; a missing row falls
    /// back to the agent type's built-in goal.
    async fn prompt_goal(&self, instance: &AgentInstance) -> Result<String, OrchestratorError> {
        match self.instances.find_template(&instance.template_id).await.map_err(storage)? {
            Some(template) => Ok(template.goal),
            None => {
                warn!(
                    instance_id = %instance.id.0,
                    template_id = %instance.template_id.0,
                    "template not found, using the built-in goal"
                );
                Ok(instance.agent_type.goal().to_string())
            }
        }
    }

    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Conversation, OrchestratorError> {
        self.conversations
            .find_by_id(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| OrchestratorError::NotFound { kind: "conversation", id: id.0.clone() })
    }

    async fn recent_turns(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<ChatTurn>, OrchestratorError> {
        let messages = self
            .conversations
            .list_recent_messages(conversation_id, HISTORY_WINDOW)
            .await
            .map_err(storage)?;

        Ok(turns_from(&messages))
    }
}

fn turns_from(messages: &[Message]) -> Vec<ChatTurn> {
    messages
        .iter()
        .map(|message| match message.sender_type {
            SenderType::Employee => ChatTurn::user(message.content.clone()),
            SenderType::Agent => ChatTurn::assistant(message.content.clone()),
        })
        .collect()
}

fn storage(error: RepositoryError) -> OrchestratorError {
    OrchestratorError::Storage(error.to_string())
}
