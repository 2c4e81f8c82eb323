//! HTTP surface of the orchestrator.
//!
//! Identity arrives resolved in headers (`x-user-id`, `x-company-id`,
//! `x-role`); authentication itself lives upstream. Errors leave as the
//! interface taxonomy: generic user-facing message plus a correlation id,
//! never internal detail.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use huddle_agent::{Orchestrator, TriggerKind};
use huddle_core::domain::agent::{EmployeeId, InstanceId};
use huddle_core::domain::conversation::{ConversationId, Message};
use huddle_core::errors::{InterfaceError, OrchestratorError};
use huddle_core::identity::RequestContext;

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/api/instances/{id}/trigger", post(trigger_instance))
        .route("/api/conversations/{id}/reply", post(reply_to_conversation))
        .with_state(ApiState { orchestrator })
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: message.into(),
                correlation_id: correlation_id.to_string(),
            },
        }
    }

    fn from_orchestrator(error: OrchestratorError, correlation_id: &str) -> Self {
        let interface = error.into_interface(correlation_id);
        warn!(
            event_name = "api.request.rejected",
            correlation_id = %interface.correlation_id(),
            detail = %interface,
            "request rejected"
        );

        let status = match &interface {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };

        Self {
            status,
            body: ErrorBody {
                error: interface.user_message().to_string(),
                correlation_id: interface.correlation_id().to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn request_context(headers: &HeaderMap, correlation_id: &str) -> Result<RequestContext, ApiError> {
    let header = |name: &str| -> Result<String, ApiError> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                ApiError::bad_request(format!("missing required header `{name}`"), correlation_id)
            })
    };

    let user_id = header("x-user-id")?;
    let company_id = header("x-company-id")?;
    let role = header("x-role")?;
    let is_admin = role == "admin";

    Ok(RequestContext { user_id, company_id, role, is_admin })
}

/// Optional body narrowing a manual run to specific employees.
#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    #[serde(default)]
    pub employee_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct RunFailureBody {
    pub employee_id: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub run_id: String,
    pub instance_id: String,
    pub messages_sent: u32,
    pub conversations_created: u32,
    pub failures: Vec<RunFailureBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<DateTime<Utc>>,
}

async fn trigger_instance(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<TriggerRequest>>,
) -> Result<(StatusCode, Json<TriggerResponse>), ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let ctx = request_context(&headers, &correlation_id)?;

    let targets: Option<Vec<EmployeeId>> = body
        .and_then(|Json(request)| request.employee_ids)
        .map(|ids| ids.into_iter().map(EmployeeId).collect());

    let result = state
        .orchestrator
        .trigger_run(&ctx, &InstanceId(id), TriggerKind::Manual, targets.as_deref(), Utc::now())
        .await
        .map_err(|error| ApiError::from_orchestrator(error, &correlation_id))?;

    Ok((
        StatusCode::OK,
        Json(TriggerResponse {
            run_id: result.run_id,
            instance_id: result.instance_id.0,
            messages_sent: result.messages_sent,
            conversations_created: result.conversations_created,
            failures: result
                .failures
                .into_iter()
                .map(|failure| RunFailureBody {
                    employee_id: failure.employee_id.0,
                    reason: failure.reason,
                })
                .collect(),
            next_run_at: result.next_run_at,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub id: String,
    pub content: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageBody {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.0,
            content: message.content,
            content_type: message.content_type.as_str().to_string(),
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub conversation_id: String,
    pub agent_message: MessageBody,
    pub escalated: bool,
    pub degraded: bool,
}

async fn reply_to_conversation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Json<ReplyRequest>,
) -> Result<(StatusCode, Json<ReplyResponse>), ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let ctx = request_context(&headers, &correlation_id)?;

    let outcome = state
        .orchestrator
        .handle_employee_reply(&ctx, &ConversationId(id), &body.content, Utc::now())
        .await
        .map_err(|error| ApiError::from_orchestrator(error, &correlation_id))?;

    Ok((
        StatusCode::OK,
        Json(ReplyResponse {
            conversation_id: outcome.conversation_id.0,
            agent_message: outcome.agent_message.into(),
            escalated: outcome.escalated,
            degraded: outcome.degraded,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use tower::util::ServiceExt;

    use huddle_agent::{OpenAiCompatibleClient, Orchestrator, ResponseGenerator, TokioBackoff};
    use huddle_core::audit::InMemoryAuditSink;
    use huddle_core::config::{LlmConfig, LlmProvider};
    use huddle_core::domain::agent::{
        AgentInstance, AgentType, AudienceSelector, EmployeeId, EmployeeRef, InstanceConfig,
        InstanceId, InstanceStatus, TemplateId,
    };
    use huddle_core::safety::SafetyClassifier;
    use huddle_core::tone::TonePreset;
    use huddle_db::repositories::{
        ConversationRepository, EmployeeDirectory, InMemoryConversationRepository,
        InMemoryEmployeeDirectory, InMemoryEscalationRepository, InMemoryInstanceRepository,
        InMemoryScheduleRepository, InstanceRepository,
    };

    use super::router;

    /// Orchestrator over in-memory repositories with an unconfigured hosted
    /// model: generation degrades to fallback copy without network calls.
    async fn test_router() -> (axum::Router, Arc<InMemoryConversationRepository>) {
        let instances = Arc::new(InMemoryInstanceRepository::default());
        let directory = Arc::new(InMemoryEmployeeDirectory::default());
        let conversations = Arc::new(InMemoryConversationRepository::default());

        instances
            .save(AgentInstance {
                id: InstanceId("i-1".to_string()),
                company_id: "company-1".to_string(),
                template_id: TemplateId("template-pulse-check".to_string()),
                agent_type: AgentType::PulseCheck,
                name: "Pulse".to_string(),
                config: InstanceConfig {
                    tone: TonePreset::Friendly,
                    audience: AudienceSelector::CompanyWide,
                    department_hint: None,
                    title_hint: None,
                },
                status: InstanceStatus::Active,
                created_at: Utc::now(),
            })
            .await
            .expect("save instance");

        directory
            .save(EmployeeRef {
                id: EmployeeId("e-1".to_string()),
                company_id: "company-1".to_string(),
                team_id: None,
                display_name: "Sam Rivera".to_string(),
                title: None,
                department: None,
            })
            .await
            .expect("save employee");

        let model = Arc::new(OpenAiCompatibleClient::from_config(&LlmConfig {
            provider: LlmProvider::OpenAi,
            api_key: None,
            base_url: None,
            model: "test".to_string(),
            timeout_secs: 1,
        }));
        let generator =
            ResponseGenerator::new(model, SafetyClassifier::default(), Arc::new(TokioBackoff));

        let orchestrator = Orchestrator::new(
            instances,
            Arc::new(InMemoryScheduleRepository::default()),
            conversations.clone(),
            Arc::new(InMemoryEscalationRepository::default()),
            directory,
            generator,
            SafetyClassifier::default(),
            Arc::new(InMemoryAuditSink::default()),
        );

        (router(Arc::new(orchestrator)), conversations)
    }

    fn trigger_request(role: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/instances/i-1/trigger")
            .header("x-user-id", "admin-1")
            .header("x-company-id", "company-1")
            .header("x-role", role)
            .body(Body::empty())
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn reply_request(conversation_id: &str, content: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/conversations/{conversation_id}/reply"))
            .header("x-user-id", "e-1")
            .header("x-company-id", "company-1")
            .header("x-role", "employee")
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"content":"{content}"}}"#)))
            .expect("request")
    }

    #[tokio::test]
    async fn missing_identity_headers_are_a_bad_request() {
        let (app, _) = test_router().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/instances/i-1/trigger")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert!(body["correlation_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn non_admin_trigger_is_forbidden() {
        let (app, _) = test_router().await;
        let response = app.oneshot(trigger_request("employee")).await.expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_instance_is_not_found() {
        let (app, _) = test_router().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/instances/ghost/trigger")
            .header("x-user-id", "admin-1")
            .header("x-company-id", "company-1")
            .header("x-role", "admin")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn trigger_accepts_an_explicit_target_list() {
        let (app, _) = test_router().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/instances/i-1/trigger")
            .header("x-user-id", "admin-1")
            .header("x-company-id", "company-1")
            .header("x-role", "admin")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"employee_ids":["e-1","ghost"]}"#))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["messages_sent"], 1);
        assert_eq!(body["failures"][0]["employee_id"], "ghost");
    }

    #[tokio::test]
    async fn reply_to_unknown_conversation_is_not_found() {
        let (app, _) = test_router().await;
        let response =
            app.oneshot(reply_request("ghost", "hello")).await.expect("reply response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn trigger_then_reply_round_trip() {
        let (app, conversations) = test_router().await;

        let response =
            app.clone().oneshot(trigger_request("admin")).await.expect("trigger response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["messages_sent"], 1);
        assert_eq!(body["conversations_created"], 1);
        assert!(body["failures"].as_array().is_some_and(Vec::is_empty));

        let conversation = conversations
            .find_open_for_pair(
                &InstanceId("i-1".to_string()),
                &EmployeeId("e-1".to_string()),
            )
            .await
            .expect("lookup")
            .expect("conversation opened by the run");

        let response = app
            .clone()
            .oneshot(reply_request(&conversation.id.0, "all good this week"))
            .await
            .expect("reply response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["conversation_id"], conversation.id.0);
        assert_eq!(body["escalated"], false);
        assert_eq!(body["degraded"], true);
        assert!(body["agent_message"]["content"].as_str().is_some_and(|c| !c.is_empty()));
    }

    #[tokio::test]
    async fn flagged_reply_escalates_and_further_replies_conflict() {
        let (app, conversations) = test_router().await;

        let response =
            app.clone().oneshot(trigger_request("admin")).await.expect("trigger response");
        assert_eq!(response.status(), StatusCode::OK);

        let conversation = conversations
            .find_open_for_pair(
                &InstanceId("i-1".to_string()),
                &EmployeeId("e-1".to_string()),
            )
            .await
            .expect("lookup")
            .expect("conversation opened by the run");

        let response = app
            .clone()
            .oneshot(reply_request(&conversation.id.0, "my manager keeps harassing me"))
            .await
            .expect("reply response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["escalated"], true);
        assert_eq!(body["agent_message"]["content_type"], "escalation");

        let response = app
            .oneshot(reply_request(&conversation.id.0, "hello again"))
            .await
            .expect("reply response");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert!(body["correlation_id"].as_str().is_some());
    }
}
