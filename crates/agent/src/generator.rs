//! Reply generation with safety pre-check, bounded retry, and tone ceilings.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use huddle_core::domain::agent::{AgentInstance, EmployeeRef};
use huddle_core::safety::{SafetyCategory, SafetyClassifier};
use huddle_core::tone::TonePreset;

use crate::llm::{ChatRole, ChatTurn, LanguageModel};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;

/// Canned copy used when the model is unreachable or unconfigured. Kept
/// under the tightest tone ceiling.
const FALLBACK_OPENING: &str =
    "Hi! Quick check-in: how has your week been going? Anything on your plate I should know about?";
const FALLBACK_REPLY: &str =
    "Thanks for sharing that - I've noted it. I'm having trouble composing a proper reply right \
     now, so let's pick this up in the next check-in.";

/// Waiting strategy between retry attempts. Injected so tests run without
/// real sleeps.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, attempt: u32);
}

/// Exponential: 2^attempt * 500ms.
#[derive(Clone, Debug, Default)]
pub struct TokioBackoff;

#[async_trait]
impl Backoff for TokioBackoff {
    async fn wait(&self, attempt: u32) {
        let millis = BACKOFF_BASE_MS * 2u64.saturating_pow(attempt);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

/// Safety concern detected in the newest inbound turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlaggedConcern {
    pub category: SafetyCategory,
    pub matched_term: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedReply {
    pub content: String,
    /// Set when the safety pre-check fired; the content is then the fixed
    /// empathetic reply, never model output.
    pub flagged: Option<FlaggedConcern>,
    /// True when the reply is fallback copy rather than model output.
    pub degraded: bool,
}

pub struct ResponseGenerator {
    model: Arc<dyn LanguageModel>,
    classifier: SafetyClassifier,
    backoff: Arc<dyn Backoff>,
}

impl ResponseGenerator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        classifier: SafetyClassifier,
        backoff: Arc<dyn Backoff>,
    ) -> Self {
        Self { model, classifier, backoff }
    }

    /// Produces a reply for the conversation. Infallible by design: model
    /// trouble degrades to fallback copy, it never propagates as an error.
    ///
    /// `goal` is the template goal the orchestrator resolved for this
    /// instance; it anchors the system prompt.
    pub async fn generate(
        &self,
        instance: &AgentInstance,
        employee: &EmployeeRef,
        goal: &str,
        history: &[ChatTurn],
    ) -> GeneratedReply {
        let tone = instance.config.tone;

        // Classify the newest inbound turn before anything reaches the model.
        if let Some(last_user_turn) =
            history.iter().rev().find(|turn| turn.role == ChatRole::User)
        {
            let verdict = self.classifier.classify(&last_user_turn.content);
            if let (Some(category), Some(matched_term)) = (verdict.category, verdict.matched_term)
            {
                return GeneratedReply {
                    content: category.empathetic_reply().to_string(),
                    flagged: Some(FlaggedConcern { category, matched_term }),
                    degraded: false,
                };
            }
        }

        if !self.model.is_configured() {
            warn!(instance_id = %instance.id.0, "language model unconfigured, using fallback copy");
            return self.fallback(history);
        }

        let system_prompt = compose_system_prompt(instance, employee, goal, tone);
        let turns = effective_history(history);

        for attempt in 0..MAX_ATTEMPTS {
            match self.model.complete(&system_prompt, &turns, tone.max_tokens()).await {
                Ok(content) => {
                    return GeneratedReply {
                        content: tone.enforce_ceiling(content.trim()),
                        flagged: None,
                        degraded: false,
                    };
                }
                Err(error) => {
                    warn!(
                        instance_id = %instance.id.0,
                        attempt = attempt + 1,
                        %error,
                        "chat completion attempt failed"
                    );
                    if attempt + 1 < MAX_ATTEMPTS {
                        self.backoff.wait(attempt + 1).await;
                    }
                }
            }
        }

        self.fallback(history)
    }

    fn fallback(&self, history: &[ChatTurn]) -> GeneratedReply {
        let content =
            if history.is_empty() { FALLBACK_OPENING } else { FALLBACK_REPLY }.to_string();
        GeneratedReply { content, flagged: None, degraded: true }
    }
}

/// An empty history means the agent opens the thread; the model still needs
/// a user turn to respond to, so one is synthesized.
fn effective_history(history: &[ChatTurn]) -> Vec<ChatTurn> {
    if history.is_empty() {
        vec![ChatTurn::user(
            "Start the conversation: send your opening check-in message now.",
        )]
    } else {
        history.to_vec()
    }
}

fn compose_system_prompt(
    instance: &AgentInstance,
    employee: &EmployeeRef,
    goal: &str,
    tone: TonePreset,
) -> String {
    let mut prompt = format!(
        "You are \"{name}\", a workplace check-in agent.\n\
         Your goal: {goal}\n\
         Style: {style}\n\
         You are talking to {descriptor}.\n\
         Hard limit: keep every reply under {ceiling} characters.",
        name = instance.name,
        style = tone.style_guidance(),
        descriptor = employee.descriptor(),
        ceiling = tone.ceiling(),
    );

    if let Some(department) = &instance.config.department_hint {
        prompt.push_str(&format!("\nAudience context: the {department} department."));
    }
    if let Some(title) = &instance.config.title_hint {
        prompt.push_str(&format!("\nAudience context: people titled {title}."));
    }

    prompt
}
