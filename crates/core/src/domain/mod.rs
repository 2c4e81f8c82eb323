pub mod agent;
pub mod conversation;
pub mod escalation;
pub mod schedule;
