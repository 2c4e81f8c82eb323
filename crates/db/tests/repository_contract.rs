use chrono::{Duration, Utc};

use huddle_core::domain::agent::{
    AgentInstance, AgentTemplate, AgentType, AudienceSelector, EmployeeId, InstanceConfig,
    InstanceId, InstanceStatus, TemplateId,
};
use huddle_core::domain::conversation::{ContentType, Conversation, Message};
use huddle_core::domain::escalation::EscalationRecord;
use huddle_core::domain::schedule::{Schedule, ScheduleId};
use huddle_core::safety::SafetyCategory;
use huddle_core::tone::TonePreset;

use huddle_db::migrations::run_pending;
use huddle_db::repositories::{
    ConversationRepository, EscalationRepository, InstanceRepository, ScheduleRepository,
    SqlConversationRepository, SqlEscalationRepository, SqlInstanceRepository,
    SqlScheduleRepository,
};
use huddle_db::{connect_with_settings, DbPool};

async fn test_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    run_pending(&pool).await.expect("migrate");
    SqlInstanceRepository::new(pool.clone())
        .save_template(AgentTemplate {
            id: TemplateId("template-pulse-check".to_string()),
            name: "Weekly Pulse Check".to_string(),
            agent_type: AgentType::PulseCheck,
            goal: AgentType::PulseCheck.goal().to_string(),
        })
        .await
        .expect("seed template");
    pool
}

fn sample_instance(id: &str) -> AgentInstance {
    AgentInstance {
        id: InstanceId(id.to_string()),
        company_id: "company-1".to_string(),
        template_id: TemplateId("template-pulse-check".to_string()),
        agent_type: AgentType::PulseCheck,
        name: "Pulse".to_string(),
        config: InstanceConfig {
            tone: TonePreset::Coaching,
            audience: AudienceSelector::Team { team_id: "team-1".to_string() },
            department_hint: Some("Engineering".to_string()),
            title_hint: None,
        },
        status: InstanceStatus::Active,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn instance_round_trips_with_config_blob() {
    let pool = test_pool().await;
    let repo = SqlInstanceRepository::new(pool);

    let instance = sample_instance("instance-1");
    repo.save(instance.clone()).await.expect("save");

    let loaded = repo
        .find_by_id(&InstanceId("instance-1".to_string()))
        .await
        .expect("find")
        .expect("exists");

    assert_eq!(loaded.config.tone, TonePreset::Coaching);
    assert_eq!(
        loaded.config.audience,
        AudienceSelector::Team { team_id: "team-1".to_string() }
    );
    assert_eq!(loaded.config.department_hint.as_deref(), Some("Engineering"));
}

#[tokio::test]
async fn due_schedules_exclude_future_and_inactive_rows() {
    let pool = test_pool().await;
    let instances = SqlInstanceRepository::new(pool.clone());
    let schedules = SqlScheduleRepository::new(pool);
    let now = Utc::now();

    for (n, (offset, is_active)) in
        [(-2i64, true), (2, true), (-1, false)].into_iter().enumerate()
    {
        let instance = sample_instance(&format!("instance-{n}"));
        instances.save(instance.clone()).await.expect("save instance");
        schedules
            .save(Schedule {
                id: ScheduleId(format!("schedule-{n}")),
                instance_id: instance.id,
                cadence: "weekly".to_string(),
                cron: None,
                timezone: "UTC".to_string(),
                next_run_at: now + Duration::hours(offset),
                is_active,
            })
            .await
            .expect("save schedule");
    }

    let due = schedules.list_due(now).await.expect("list due");
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id.0, "schedule-0");

    let advanced = now + Duration::days(7);
    schedules.update_next_run(&due[0].id, advanced).await.expect("advance");
    assert!(schedules.list_due(now).await.expect("list again").is_empty());
}

#[tokio::test]
async fn message_appends_are_atomic_with_counter_bumps() {
    let pool = test_pool().await;
    let instances = SqlInstanceRepository::new(pool.clone());
    let conversations = SqlConversationRepository::new(pool);

    let instance = sample_instance("instance-1");
    instances.save(instance.clone()).await.expect("save instance");

    let conversation =
        Conversation::open(instance.id.clone(), EmployeeId("employee-1".to_string()), Utc::now());
    let id = conversation.id.clone();
    conversations.create(conversation).await.expect("create");

    conversations
        .append_agent_message(Message::from_agent(
            id.clone(),
            "How has this week felt?",
            ContentType::Text,
            Utc::now(),
        ))
        .await
        .expect("agent append");
    conversations
        .append_employee_message(Message::from_employee(id.clone(), "Hectic", Utc::now()))
        .await
        .expect("employee append");

    let stored = conversations.find_by_id(&id).await.expect("find").expect("exists");
    assert_eq!(stored.message_count, 2);
    assert_eq!(stored.unread_count, 1);
    assert!(stored.last_message_at.is_some());

    let open = conversations
        .find_open_for_pair(&instance.id, &EmployeeId("employee-1".to_string()))
        .await
        .expect("find open");
    assert_eq!(open.map(|c| c.id), Some(id));
}

#[tokio::test]
async fn recent_messages_window_is_chronological() {
    let pool = test_pool().await;
    let instances = SqlInstanceRepository::new(pool.clone());
    let conversations = SqlConversationRepository::new(pool);

    let instance = sample_instance("instance-1");
    instances.save(instance.clone()).await.expect("save instance");
    let conversation =
        Conversation::open(instance.id, EmployeeId("employee-1".to_string()), Utc::now());
    let id = conversation.id.clone();
    conversations.create(conversation).await.expect("create");

    let base = Utc::now();
    for n in 0..12 {
        conversations
            .append_employee_message(Message::from_employee(
                id.clone(),
                format!("message {n}"),
                base + Duration::seconds(n),
            ))
            .await
            .expect("append");
    }

    let recent = conversations.list_recent_messages(&id, 10).await.expect("list");
    assert_eq!(recent.len(), 10);
    assert_eq!(recent.first().map(|m| m.content.as_str()), Some("message 2"));
    assert_eq!(recent.last().map(|m| m.content.as_str()), Some("message 11"));
}

#[tokio::test]
async fn open_escalation_lookup_finds_only_open_records() {
    let pool = test_pool().await;
    let instances = SqlInstanceRepository::new(pool.clone());
    let conversations = SqlConversationRepository::new(pool.clone());
    let escalations = SqlEscalationRepository::new(pool);

    let instance = sample_instance("instance-1");
    instances.save(instance.clone()).await.expect("save instance");
    let conversation =
        Conversation::open(instance.id, EmployeeId("employee-1".to_string()), Utc::now());
    let id = conversation.id.clone();
    conversations.create(conversation).await.expect("create");

    let message = Message::from_employee(id.clone(), "my manager keeps threatening me", Utc::now());
    conversations.append_employee_message(message.clone()).await.expect("append");

    assert!(escalations
        .find_open_for_conversation(&id)
        .await
        .expect("lookup before")
        .is_none());

    escalations
        .create(EscalationRecord::for_flagged_message(
            id.clone(),
            message.id,
            SafetyCategory::Harassment,
            "threaten",
            Utc::now(),
        ))
        .await
        .expect("create escalation");

    let open = escalations
        .find_open_for_conversation(&id)
        .await
        .expect("lookup after")
        .expect("open record");
    assert_eq!(open.conversation_id, id);
}
