//! Deterministic demo dataset: the four system personas, a small company
//! directory, and one pulse-check deployment that is due immediately.

use chrono::{TimeZone, Utc};

use huddle_core::domain::agent::{
    AgentInstance, AgentTemplate, AgentType, AudienceSelector, EmployeeId, EmployeeRef,
    InstanceConfig, InstanceId, InstanceStatus, TemplateId,
};
use huddle_core::domain::schedule::{Schedule, ScheduleId};
use huddle_core::tone::TonePreset;

use crate::repositories::{
    EmployeeDirectory, InstanceRepository, RepositoryError, ScheduleRepository,
    SqlEmployeeDirectory, SqlInstanceRepository, SqlScheduleRepository,
};
use crate::DbPool;

pub const DEMO_COMPANY_ID: &str = "company-demo";
pub const DEMO_INSTANCE_ID: &str = "instance-pulse-demo";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedReport {
    pub templates: usize,
    pub employees: usize,
    pub instances: usize,
    pub schedules: usize,
}

pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedReport, RepositoryError> {
        let instances = SqlInstanceRepository::new(pool.clone());
        let directory = SqlEmployeeDirectory::new(pool.clone());
        let schedules = SqlScheduleRepository::new(pool.clone());

        let templates = demo_templates();
        for template in &templates {
            instances.save_template(template.clone()).await?;
        }

        let employees = demo_employees();
        for employee in &employees {
            directory.save(employee.clone()).await?;
        }

        instances.save(demo_instance()).await?;
        schedules.save(demo_schedule()).await?;

        Ok(SeedReport {
            templates: templates.len(),
            employees: employees.len(),
            instances: 1,
            schedules: 1,
        })
    }
}

pub fn demo_templates() -> Vec<AgentTemplate> {
    [
        (AgentType::PulseCheck, "template-pulse-check", "Weekly Pulse Check"),
        (AgentType::Onboarding, "template-onboarding", "New Hire Onboarding"),
        (AgentType::ExitInterview, "template-exit-interview", "Exit Interview"),
        (AgentType::ManagerCoaching, "template-manager-coaching", "Manager Coaching"),
    ]
    .into_iter()
    .map(|(agent_type, id, name)| AgentTemplate {
        id: TemplateId(id.to_string()),
        name: name.to_string(),
        agent_type,
        goal: agent_type.goal().to_string(),
    })
    .collect()
}

pub fn demo_employees() -> Vec<EmployeeRef> {
    [
        ("employee-ada", Some("team-platform"), "Ada Virtanen", Some("Staff Engineer"), Some("Engineering")),
        ("employee-ben", Some("team-platform"), "Ben Okafor", Some("Backend Engineer"), Some("Engineering")),
        ("employee-cho", Some("team-growth"), "Cho Min-seo", Some("Product Manager"), Some("Product")),
        ("employee-dia", Some("team-growth"), "Dia Kapoor", Some("Designer"), Some("Product")),
        ("employee-eli", None, "Eli Andersson", Some("People Partner"), Some("HR")),
    ]
    .into_iter()
    .map(|(id, team_id, display_name, title, department)| EmployeeRef {
        id: EmployeeId(id.to_string()),
        company_id: DEMO_COMPANY_ID.to_string(),
        team_id: team_id.map(str::to_string),
        display_name: display_name.to_string(),
        title: title.map(str::to_string),
        department: department.map(str::to_string),
    })
    .collect()
}

fn demo_instance() -> AgentInstance {
    AgentInstance {
        id: InstanceId(DEMO_INSTANCE_ID.to_string()),
        company_id: DEMO_COMPANY_ID.to_string(),
        template_id: TemplateId("template-pulse-check".to_string()),
        agent_type: AgentType::PulseCheck,
        name: "Weekly pulse for the demo company".to_string(),
        config: InstanceConfig {
            tone: TonePreset::Friendly,
            audience: AudienceSelector::CompanyWide,
            department_hint: None,
            title_hint: None,
        },
        status: InstanceStatus::Active,
        created_at: seed_epoch(),
    }
}

fn demo_schedule() -> Schedule {
    Schedule {
        id: ScheduleId("schedule-pulse-demo".to_string()),
        instance_id: InstanceId(DEMO_INSTANCE_ID.to_string()),
        cadence: "weekly".to_string(),
        cron: None,
        timezone: "Europe/Helsinki".to_string(),
        // In the past so the first trigger after seeding finds it due.
        next_run_at: seed_epoch(),
        is_active: true,
    }
}

fn seed_epoch() -> chrono::DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0) {
        chrono::LocalResult::Single(ts) => ts,
        _ => Utc::now(),
    }
}
