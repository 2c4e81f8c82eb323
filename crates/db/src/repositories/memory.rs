//! In-memory repositories used by unit tests and the doctor command.
//! Behavior mirrors the SQL implementations, including the atomic
//! append-and-bump contract on conversations.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use huddle_core::domain::agent::{
    AgentInstance, AgentTemplate, EmployeeId, EmployeeRef, InstanceId, TemplateId,
};
use huddle_core::domain::conversation::{
    Conversation, ConversationId, ConversationStatus, Message,
};
use huddle_core::domain::escalation::{EscalationRecord, EscalationStatus};
use huddle_core::domain::schedule::{Schedule, ScheduleId};

use super::{
    ConversationRepository, EmployeeDirectory, EscalationRepository, InstanceRepository,
    RepositoryError, ScheduleRepository,
};

#[derive(Clone, Default)]
pub struct InMemoryInstanceRepository {
    instances: Arc<RwLock<HashMap<String, AgentInstance>>>,
    templates: Arc<RwLock<HashMap<String, AgentTemplate>>>,
}

#[async_trait::async_trait]
impl InstanceRepository for InMemoryInstanceRepository {
    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<AgentInstance>, RepositoryError> {
        Ok(self.instances.read().await.get(&id.0).cloned())
    }

    async fn save(&self, instance: AgentInstance) -> Result<(), RepositoryError> {
        self.instances.write().await.insert(instance.id.0.clone(), instance);
        Ok(())
    }

    async fn find_template(
        &self,
        id: &TemplateId,
    ) -> Result<Option<AgentTemplate>, RepositoryError> {
        Ok(self.templates.read().await.get(&id.0).cloned())
    }

    async fn save_template(&self, template: AgentTemplate) -> Result<(), RepositoryError> {
        self.templates.write().await.insert(template.id.0.clone(), template);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryScheduleRepository {
    schedules: Arc<RwLock<HashMap<String, Schedule>>>,
}

#[async_trait::async_trait]
impl ScheduleRepository for InMemoryScheduleRepository {
    async fn find_by_id(&self, id: &ScheduleId) -> Result<Option<Schedule>, RepositoryError> {
        Ok(self.schedules.read().await.get(&id.0).cloned())
    }

    async fn find_by_instance(
        &self,
        instance_id: &InstanceId,
    ) -> Result<Option<Schedule>, RepositoryError> {
        Ok(self
            .schedules
            .read()
            .await
            .values()
            .find(|schedule| schedule.instance_id == *instance_id)
            .cloned())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>, RepositoryError> {
        let mut due: Vec<Schedule> = self
            .schedules
            .read()
            .await
            .values()
            .filter(|schedule| schedule.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|schedule| schedule.next_run_at);
        Ok(due)
    }

    async fn save(&self, schedule: Schedule) -> Result<(), RepositoryError> {
        self.schedules.write().await.insert(schedule.id.0.clone(), schedule);
        Ok(())
    }

    async fn update_next_run(
        &self,
        id: &ScheduleId,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        if let Some(schedule) = self.schedules.write().await.get_mut(&id.0) {
            schedule.next_run_at = next_run_at;
        }
        Ok(())
    }
}

#[derive(Default)]
struct ConversationStore {
    conversations: HashMap<String, Conversation>,
    messages: HashMap<String, Vec<Message>>,
}

#[derive(Clone, Default)]
pub struct InMemoryConversationRepository {
    store: Arc<RwLock<ConversationStore>>,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self.store.read().await.conversations.get(&id.0).cloned())
    }

    async fn find_open_for_pair(
        &self,
        instance_id: &InstanceId,
        employee_id: &EmployeeId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self
            .store
            .read()
            .await
            .conversations
            .values()
            .find(|conversation| {
                conversation.instance_id == *instance_id
                    && conversation.employee_id == *employee_id
                    && conversation.status == ConversationStatus::Active
            })
            .cloned())
    }

    async fn find_latest_for_pair(
        &self,
        instance_id: &InstanceId,
        employee_id: &EmployeeId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self
            .store
            .read()
            .await
            .conversations
            .values()
            .filter(|conversation| {
                conversation.instance_id == *instance_id
                    && conversation.employee_id == *employee_id
            })
            .max_by_key(|conversation| conversation.created_at)
            .cloned())
    }

    async fn create(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        self.store.write().await.conversations.insert(conversation.id.0.clone(), conversation);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), RepositoryError> {
        if let Some(conversation) = self.store.write().await.conversations.get_mut(&id.0) {
            conversation.status = status;
        }
        Ok(())
    }

    async fn append_employee_message(&self, message: Message) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        if let Some(conversation) = store.conversations.get_mut(&message.conversation_id.0) {
            conversation.message_count += 1;
            conversation.last_message_at = Some(message.created_at);
        }
        store.messages.entry(message.conversation_id.0.clone()).or_default().push(message);
        Ok(())
    }

    async fn append_agent_message(&self, message: Message) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        if let Some(conversation) = store.conversations.get_mut(&message.conversation_id.0) {
            conversation.message_count += 1;
            conversation.unread_count += 1;
            conversation.last_message_at = Some(message.created_at);
        }
        store.messages.entry(message.conversation_id.0.clone()).or_default().push(message);
        Ok(())
    }

    async fn list_recent_messages(
        &self,
        id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let store = self.store.read().await;
        let messages = store.messages.get(&id.0).cloned().unwrap_or_default();
        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages.into_iter().skip(skip).collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEscalationRepository {
    records: Arc<RwLock<Vec<EscalationRecord>>>,
}

impl InMemoryEscalationRepository {
    pub async fn all(&self) -> Vec<EscalationRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait::async_trait]
impl EscalationRepository for InMemoryEscalationRepository {
    async fn create(&self, record: EscalationRecord) -> Result<(), RepositoryError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn find_open_for_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<EscalationRecord>, RepositoryError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .rev()
            .find(|record| {
                record.conversation_id == *conversation_id
                    && record.status == EscalationStatus::Open
            })
            .cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEmployeeDirectory {
    employees: Arc<RwLock<HashMap<String, EmployeeRef>>>,
}

#[async_trait::async_trait]
impl EmployeeDirectory for InMemoryEmployeeDirectory {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<EmployeeRef>, RepositoryError> {
        Ok(self.employees.read().await.get(&id.0).cloned())
    }

    async fn list_company(&self, company_id: &str) -> Result<Vec<EmployeeRef>, RepositoryError> {
        let mut listed: Vec<EmployeeRef> = self
            .employees
            .read()
            .await
            .values()
            .filter(|employee| employee.company_id == company_id)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(listed)
    }

    async fn list_team(
        &self,
        company_id: &str,
        team_id: &str,
    ) -> Result<Vec<EmployeeRef>, RepositoryError> {
        let mut listed: Vec<EmployeeRef> = self
            .employees
            .read()
            .await
            .values()
            .filter(|employee| {
                employee.company_id == company_id && employee.team_id.as_deref() == Some(team_id)
            })
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(listed)
    }

    async fn save(&self, employee: EmployeeRef) -> Result<(), RepositoryError> {
        self.employees.write().await.insert(employee.id.0.clone(), employee);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use huddle_core::domain::agent::{EmployeeId, InstanceId};
    use huddle_core::domain::conversation::{ContentType, Conversation, Message};

    use super::InMemoryConversationRepository;
    use crate::repositories::ConversationRepository;

    #[tokio::test]
    async fn appends_bump_counters_and_last_message_at() {
        let repo = InMemoryConversationRepository::default();
        let conversation = Conversation::open(
            InstanceId("i-1".to_string()),
            EmployeeId("e-1".to_string()),
            Utc::now(),
        );
        let id = conversation.id.clone();
        repo.create(conversation).await.expect("create");

        repo.append_agent_message(Message::from_agent(
            id.clone(),
            "How is the week going?",
            ContentType::Text,
            Utc::now(),
        ))
        .await
        .expect("agent message");
        repo.append_employee_message(Message::from_employee(id.clone(), "Busy!", Utc::now()))
            .await
            .expect("employee message");

        let stored = repo.find_by_id(&id).await.expect("find").expect("exists");
        assert_eq!(stored.message_count, 2);
        assert_eq!(stored.unread_count, 1);
        assert!(stored.last_message_at.is_some());
    }

    #[tokio::test]
    async fn recent_messages_keep_chronological_order_and_window() {
        let repo = InMemoryConversationRepository::default();
        let conversation = Conversation::open(
            InstanceId("i-1".to_string()),
            EmployeeId("e-1".to_string()),
            Utc::now(),
        );
        let id = conversation.id.clone();
        repo.create(conversation).await.expect("create");

        for n in 0..12 {
            repo.append_employee_message(Message::from_employee(
                id.clone(),
                format!("message {n}"),
                Utc::now(),
            ))
            .await
            .expect("append");
        }

        let recent = repo.list_recent_messages(&id, 10).await.expect("list");
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().map(|m| m.content.as_str()), Some("message 2"));
        assert_eq!(recent.last().map(|m| m.content.as_str()), Some("message 11"));
    }
}
