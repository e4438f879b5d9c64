//! REST endpoints for intake flows and sessions.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::store::SessionStore;
use crate::error::FlowError;
use crate::intake::{FieldValue, FlowCatalog, FlowController, FlowSession, FlowStatus};
use crate::sink::SubmissionSink;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<FlowCatalog>,
    pub sessions: Arc<SessionStore>,
    pub sink: Arc<dyn SubmissionSink>,
}

/// Build the Axum router with flow and session routes.
pub fn intake_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/flows", get(list_flows))
        .route("/api/flows/{flow}", get(get_flow))
        .route("/api/flows/{flow}/sessions", post(start_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/fields/{name}", put(set_field))
        .route("/api/sessions/{id}/fields/{name}/toggle", post(toggle_field))
        .route("/api/sessions/{id}/advance", post(advance))
        .route("/api/sessions/{id}/retreat", post(retreat))
        .route("/api/sessions/{id}/submit", post(submit))
        .route("/api/sessions/{id}/restart", post(restart))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "guided-intake"
    }))
}

// ── Responses ───────────────────────────────────────────────────────────

fn error_body(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({"error": message.to_string()}))).into_response()
}

fn flow_error(err: FlowError) -> Response {
    match err {
        FlowError::Validation(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "validation_failed",
                "field": e.field(),
                "message": e.user_message(),
            })),
        )
            .into_response(),
        FlowError::Router(e) => error_body(StatusCode::UNPROCESSABLE_ENTITY, e),
        FlowError::UnknownField { .. } => error_body(StatusCode::NOT_FOUND, err),
        FlowError::KindMismatch { .. }
        | FlowError::UnknownOption { .. }
        | FlowError::InvalidDate { .. } => error_body(StatusCode::BAD_REQUEST, err),
        FlowError::NotReadyToSubmit | FlowError::AlreadySubmitted => {
            error_body(StatusCode::CONFLICT, err)
        }
        FlowError::Submission(e) => error_body(StatusCode::BAD_GATEWAY, e),
        FlowError::UnknownStep(_) => {
            error!(error = %err, "Session points at a step outside its flow");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

/// Session plus everything a client needs to render the current step.
fn session_view(controller: &FlowController, session: &FlowSession) -> serde_json::Value {
    let step = controller.current_step(session).ok();
    let values: serde_json::Map<String, serde_json::Value> = step
        .map(|s| {
            s.fields
                .iter()
                .filter_map(|f| {
                    let value = session.draft.get(&f.name)?;
                    Some((f.name.clone(), serde_json::to_value(value).ok()?))
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "session": session,
        "step": step,
        "values": values,
        "progress": controller.progress(session),
    })
}

fn parse_id(id: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(id).map_err(|_| error_body(StatusCode::BAD_REQUEST, "Invalid session ID"))
}

/// Look up a session and the controller for its flow.
async fn load(
    state: &AppState,
    id: &str,
) -> Result<(Arc<tokio::sync::Mutex<FlowSession>>, FlowController), Response> {
    let id = parse_id(id)?;
    let slot = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| error_body(StatusCode::NOT_FOUND, "Session not found"))?;
    let flow = slot.lock().await.flow.clone();
    let controller = state
        .catalog
        .get(&flow)
        .cloned()
        .ok_or_else(|| error_body(StatusCode::NOT_FOUND, format!("Unknown flow {flow}")))?;
    Ok((slot, controller))
}

// ── Flows ───────────────────────────────────────────────────────────────

async fn list_flows(State(state): State<AppState>) -> impl IntoResponse {
    let flows: Vec<serde_json::Value> = state
        .catalog
        .flows()
        .map(|c| {
            let graph = c.graph();
            json!({
                "flow": graph.flow(),
                "entry": graph.entry(),
                "steps": graph.steps().count(),
                "confirmation_path": graph.confirmation_path(),
            })
        })
        .collect();
    Json(flows)
}

async fn get_flow(State(state): State<AppState>, Path(flow): Path<String>) -> Response {
    match state.catalog.get(&flow) {
        Some(controller) => Json(controller.graph()).into_response(),
        None => error_body(StatusCode::NOT_FOUND, "Flow not found"),
    }
}

async fn start_session(State(state): State<AppState>, Path(flow): Path<String>) -> Response {
    let Some(controller) = state.catalog.get(&flow) else {
        return error_body(StatusCode::NOT_FOUND, "Flow not found");
    };
    let session = controller.start();
    let view = session_view(controller, &session);
    state.sessions.insert(session).await;
    (StatusCode::CREATED, Json(view)).into_response()
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let (slot, controller) = match load(&state, &id).await {
        Ok(found) => found,
        Err(resp) => return resp,
    };
    let session = slot.lock().await;
    Json(session_view(&controller, &session)).into_response()
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if state.sessions.remove(id).await {
        info!(session_id = %id, "Intake session abandoned");
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_body(StatusCode::NOT_FOUND, "Session not found")
    }
}

#[derive(Deserialize)]
struct SetFieldRequest {
    value: FieldValue,
}

async fn set_field(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
    Json(body): Json<SetFieldRequest>,
) -> Response {
    let (slot, controller) = match load(&state, &id).await {
        Ok(found) => found,
        Err(resp) => return resp,
    };
    let mut session = slot.lock().await;
    match controller.set_field(&mut session, &name, body.value) {
        Ok(()) => Json(session_view(&controller, &session)).into_response(),
        Err(e) => flow_error(e),
    }
}

#[derive(Deserialize)]
struct ToggleRequest {
    option: String,
}

async fn toggle_field(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
    Json(body): Json<ToggleRequest>,
) -> Response {
    let (slot, controller) = match load(&state, &id).await {
        Ok(found) => found,
        Err(resp) => return resp,
    };
    let mut session = slot.lock().await;
    match controller.toggle_field(&mut session, &name, &body.option) {
        Ok(()) => Json(session_view(&controller, &session)).into_response(),
        Err(e) => flow_error(e),
    }
}

/// Validate and move on. Passing the terminal step submits in the same
/// request; if the sink fails the session stays ready for `/submit`.
async fn advance(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let (slot, controller) = match load(&state, &id).await {
        Ok(found) => found,
        Err(resp) => return resp,
    };
    let mut session = slot.lock().await;
    match controller.advance(&session) {
        Ok(next) => *session = next,
        Err(e) => return flow_error(e),
    }

    if session.status == FlowStatus::AwaitingSubmission {
        if let Err(e) = controller.submit(&mut session, state.sink.as_ref()).await {
            warn!(session_id = %session.id, error = %e, "Submission failed after final step");
            return match e {
                FlowError::Submission(cause) => (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({
                        "error": cause.to_string(),
                        "retry": format!("/api/sessions/{}/submit", session.id),
                        "view": session_view(&controller, &session),
                    })),
                )
                    .into_response(),
                other => flow_error(other),
            };
        }
    }
    Json(session_view(&controller, &session)).into_response()
}

async fn retreat(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let (slot, controller) = match load(&state, &id).await {
        Ok(found) => found,
        Err(resp) => return resp,
    };
    let mut session = slot.lock().await;
    *session = controller.retreat(&session);
    Json(session_view(&controller, &session)).into_response()
}

async fn submit(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let (slot, controller) = match load(&state, &id).await {
        Ok(found) => found,
        Err(resp) => return resp,
    };
    let mut session = slot.lock().await;
    match controller.submit(&mut session, state.sink.as_ref()).await {
        Ok(_) => Json(session_view(&controller, &session)).into_response(),
        Err(e) => flow_error(e),
    }
}

async fn restart(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let (slot, controller) = match load(&state, &id).await {
        Ok(found) => found,
        Err(resp) => return resp,
    };
    let mut session = slot.lock().await;
    *session = controller.restart(&session);
    Json(session_view(&controller, &session)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::error::SubmissionError;
    use crate::sink::{Receipt, Submission};

    struct FlakySink {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl SubmissionSink for FlakySink {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn submit(&self, submission: &Submission) -> Result<Receipt, SubmissionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(SubmissionError::Unavailable {
                    sink: "flaky".into(),
                    reason: "connection refused".into(),
                });
            }
            Ok(Receipt::for_submission(submission, "flaky", format!("ref-{n}")))
        }
    }

    fn app(fail_first: bool) -> (Router, Arc<FlakySink>) {
        let sink = Arc::new(FlakySink {
            calls: AtomicUsize::new(0),
            fail_first,
        });
        let state = AppState {
            catalog: Arc::new(FlowCatalog::standard().unwrap()),
            sessions: SessionStore::new(Duration::from_secs(600)),
            sink: sink.clone(),
        };
        (intake_routes(state), sink)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn start(app: &Router, flow: &str) -> String {
        let (status, body) = call(app, "POST", &format!("/api/flows/{flow}/sessions"), None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session"]["id"].as_str().unwrap().to_string()
    }

    async fn set(app: &Router, id: &str, name: &str, value: Value) -> StatusCode {
        call(
            app,
            "PUT",
            &format!("/api/sessions/{id}/fields/{name}"),
            Some(json!({"value": value})),
        )
        .await
        .0
    }

    #[tokio::test]
    async fn lists_flows() {
        let (app, _) = app(false);
        let (status, body) = call(&app, "GET", "/api/flows", None).await;
        assert_eq!(status, StatusCode::OK);
        let flows = body.as_array().unwrap();
        assert!(flows.iter().any(|f| f["flow"] == "survey" && f["entry"] == "general-info"));

        let (status, _) = call(&app, "GET", "/api/flows/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn new_session_shows_entry_step() {
        let (app, _) = app(false);
        let (status, body) = call(&app, "POST", "/api/flows/survey/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["step"]["id"], "general-info");
        assert_eq!(body["values"]["projectTypes"], json!([]));
        assert_eq!(body["values"]["name"], "");
        assert_eq!(body["progress"]["step"], 1);
        assert_eq!(body["progress"]["total"], 3);
    }

    #[tokio::test]
    async fn advancing_with_missing_fields_is_unprocessable() {
        let (app, _) = app(false);
        let id = start(&app, "survey").await;
        let (status, body) = call(&app, "POST", &format!("/api/sessions/{id}/advance"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "projectTypes");
        assert_eq!(body["message"], "Please fill in all required fields");

        let (_, view) = call(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(view["step"]["id"], "general-info");
    }

    #[tokio::test]
    async fn bad_input_is_rejected() {
        let (app, _) = app(false);
        let id = start(&app, "survey").await;
        assert_eq!(set(&app, &id, "industry", json!("Astronauts")).await, StatusCode::BAD_REQUEST);
        assert_eq!(set(&app, &id, "name", json!(true)).await, StatusCode::BAD_REQUEST);
        assert_eq!(set(&app, &id, "homeType", json!("Tiny Home")).await, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", "/api/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(&app, "GET", &format!("/api/sessions/{}", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_final_submission_can_be_retried() {
        let (app, sink) = app(true);
        let id = start(&app, "media-information").await;

        assert_eq!(set(&app, &id, "name", json!("Sam Reporter")).await, StatusCode::OK);
        assert_eq!(set(&app, &id, "email", json!("sam@news.example")).await, StatusCode::OK);
        let (status, _) = call(&app, "POST", &format!("/api/sessions/{id}/advance"), None).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(set(&app, &id, "mediaType", json!("Television")).await, StatusCode::OK);
        assert_eq!(set(&app, &id, "storyType", json!("Case Study")).await, StatusCode::OK);
        assert_eq!(set(&app, &id, "deadline", json!("next week")).await, StatusCode::BAD_REQUEST);
        assert_eq!(set(&app, &id, "deadline", json!("2026-11-30")).await, StatusCode::OK);
        let (status, _) = call(&app, "POST", &format!("/api/sessions/{id}/advance"), None).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(set(&app, &id, "agreeToContact", json!(true)).await, StatusCode::OK);
        let (status, body) = call(&app, "POST", &format!("/api/sessions/{id}/advance"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Please agree to the terms and contact preferences");

        assert_eq!(set(&app, &id, "agreeToTerms", json!(true)).await, StatusCode::OK);
        let (status, body) = call(&app, "POST", &format!("/api/sessions/{id}/advance"), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["view"]["session"]["status"], "awaiting_submission");

        let (status, body) = call(&app, "POST", &format!("/api/sessions/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["status"], "submitted");
        assert_eq!(body["session"]["receipt"]["confirmation_path"], "/media/confirmation");
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);

        let (status, _) = call(&app, "POST", &format!("/api/sessions/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn contact_message_submits_in_one_step() {
        let (app, sink) = app(false);
        let id = start(&app, "contact").await;

        assert_eq!(set(&app, &id, "name", json!("Lee Visitor")).await, StatusCode::OK);
        assert_eq!(set(&app, &id, "email", json!("lee@example.com")).await, StatusCode::OK);
        assert_eq!(set(&app, &id, "reason", json!("Media Request")).await, StatusCode::OK);
        assert_eq!(set(&app, &id, "urgency", json!("Tomorrow")).await, StatusCode::BAD_REQUEST);
        assert_eq!(set(&app, &id, "agreeToContact", json!(true)).await, StatusCode::OK);
        assert_eq!(set(&app, &id, "agreeToTerms", json!(true)).await, StatusCode::OK);

        let (status, body) = call(&app, "POST", &format!("/api/sessions/{id}/advance"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "message");
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);

        assert_eq!(set(&app, &id, "message", json!("Do you print garages?")).await, StatusCode::OK);
        let (status, body) = call(&app, "POST", &format!("/api/sessions/{id}/advance"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["status"], "submitted");
        assert_eq!(body["session"]["receipt"]["confirmation_path"], "/contact");
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_before_final_step_conflicts() {
        let (app, sink) = app(false);
        let id = start(&app, "survey").await;
        let (status, _) = call(&app, "POST", &format!("/api/sessions/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn toggle_retreat_restart_and_delete() {
        let (app, _) = app(false);
        let id = start(&app, "survey").await;

        let uri = format!("/api/sessions/{id}/fields/projectTypes/toggle");
        call(&app, "POST", &uri, Some(json!({"option": "residential"}))).await;
        let (status, body) = call(&app, "POST", &uri, Some(json!({"option": "custom"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["values"]["projectTypes"], json!(["residential", "custom"]));

        let (status, _) = call(&app, "POST", &uri, Some(json!({"option": "spaceport"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "POST", &format!("/api/sessions/{id}/retreat"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"]["id"], "general-info");

        let (_, body) = call(&app, "POST", &format!("/api/sessions/{id}/restart"), None).await;
        assert_eq!(body["session"]["id"], id.as_str());
        assert_eq!(body["values"]["projectTypes"], json!([]));

        let (status, _) = call(&app, "DELETE", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "DELETE", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
