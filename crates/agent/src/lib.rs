//! Agent runtime - conversation orchestration and reply generation
//!
//! This crate is the acting layer of the huddle system:
//! - Runs scheduled and manual check-in rounds against an agent instance
//! - Handles inbound employee replies with safety classification first
//! - Generates tone-constrained replies through a pluggable language model
//! - Serializes concurrent work per (instance, employee) pair
//!
//! # Architecture
//!
//! A run or reply follows a constrained pipeline:
//! 1. **Authorization** (`runtime`) - company scope, admin and participant checks
//! 2. **Safety classification** - keyword scan before any model call
//! 3. **Generation** (`generator`) - retry, truncation, and fallback policy
//! 4. **Persistence** - atomic message appends through the repository layer
//!
//! # Safety principle
//!
//! The language model never decides escalations or conversation state.
//! Classification is deterministic, the lifecycle engine owns transitions,
//! and a model outage degrades to fallback copy instead of an error.

pub mod generator;
pub mod llm;
pub mod locks;
pub mod runtime;

pub use generator::{Backoff, FlaggedConcern, GeneratedReply, ResponseGenerator, TokioBackoff};
pub use llm::{ChatRole, ChatTurn, LanguageModel, OpenAiCompatibleClient};
pub use locks::ConversationLocks;
pub use runtime::{Orchestrator, ReplyOutcome, RunFailure, RunResult, TriggerKind};
