//! `DebugDaemon`: the axum HTTP facade over [`crate::DebugCoordinator`].

use std::sync::Arc;

use adt_domain::debug::{Breakpoint, BreakpointKind};
use adt_domain::Error;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{DebugCoordinator, StepKind};

type AppState = Arc<DebugCoordinator>;

pub fn router(coordinator: Arc<DebugCoordinator>) -> Router {
    Router::new()
        .route("/session", post(start_session).get(get_session).delete(delete_session))
        .route("/breakpoint", post(create_breakpoint).delete(delete_breakpoint))
        .route("/breakpoints", get(list_breakpoints))
        .route("/step", post(step))
        .route("/stack", get(get_stack))
        .route("/variables", get(get_variables))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

async fn health() -> impl IntoResponse {
    Json(json!({"success": true, "data": {"status": "ok"}}))
}

#[derive(Deserialize)]
struct StartSessionBody {
    #[serde(default = "default_user")]
    user: String,
    timeout: Option<u64>,
}

fn default_user() -> String {
    "DEVELOPER".to_string()
}

async fn start_session(State(coordinator): State<AppState>, body: Json<StartSessionBody>) -> Response {
    match coordinator.start_session(&body.user, body.timeout).await {
        Ok(session) => ok(json!(session)),
        Err(e) => err(e),
    }
}

async fn get_session(State(coordinator): State<AppState>) -> Response {
    match coordinator.get_session().await {
        Ok(session) => ok(json!(session)),
        Err(e) => err(e),
    }
}

async fn delete_session(State(coordinator): State<AppState>) -> Response {
    match coordinator.delete_session().await {
        Ok(()) => ok(json!({"status": "stopped"})),
        Err(e) => err(e),
    }
}

#[derive(Deserialize)]
struct CreateBreakpointBody {
    kind: BreakpointKind,
    uri: Option<String>,
    line: Option<u32>,
    exception: Option<String>,
    statement: Option<String>,
    condition: Option<String>,
    #[serde(default = "default_user")]
    user: String,
}

async fn create_breakpoint(
    State(coordinator): State<AppState>,
    Json(body): Json<CreateBreakpointBody>,
) -> Response {
    let bp = Breakpoint {
        id: None,
        kind: body.kind,
        uri: body.uri,
        line: body.line,
        exception: body.exception,
        statement: body.statement,
        condition: body.condition,
        enabled: true,
        user: body.user,
    };
    match coordinator.create_breakpoint(bp).await {
        Ok(created) => ok(json!(created)),
        Err(e) => err(e),
    }
}

#[derive(Deserialize)]
struct ListBreakpointsQuery {
    #[serde(default = "default_user")]
    user: String,
}

async fn list_breakpoints(
    State(coordinator): State<AppState>,
    Query(q): Query<ListBreakpointsQuery>,
) -> Response {
    match coordinator.list_breakpoints(&q.user).await {
        Ok(bps) => ok(json!(bps)),
        Err(e) => err(e),
    }
}

#[derive(Deserialize)]
struct DeleteBreakpointQuery {
    id: String,
}

async fn delete_breakpoint(
    State(coordinator): State<AppState>,
    Query(q): Query<DeleteBreakpointQuery>,
) -> Response {
    match coordinator.delete_breakpoint(&q.id).await {
        Ok(()) => ok(json!({"id": q.id, "deleted": true})),
        Err(e) => err(e),
    }
}

#[derive(Deserialize)]
struct StepBody {
    #[serde(rename = "type")]
    kind: String,
    uri: Option<String>,
}

async fn step(State(coordinator): State<AppState>, Json(body): Json<StepBody>) -> Response {
    let kind = match parse_step_kind(&body.kind) {
        Some(k) => k,
        None => {
            return err(Error::InvalidArgument(format!(
                "unknown step type: {}",
                body.kind
            )))
        }
    };
    match coordinator.step(kind, body.uri.as_deref()).await {
        Ok(session) => ok(json!(session)),
        Err(e) => err(e),
    }
}

fn parse_step_kind(s: &str) -> Option<StepKind> {
    Some(match s {
        "stepInto" => StepKind::Into,
        "stepOver" => StepKind::Over,
        "stepReturn" => StepKind::Return,
        "stepContinue" => StepKind::Continue,
        "stepRunToLine" => StepKind::RunToLine,
        "stepJumpToLine" => StepKind::JumpToLine,
        "terminate" => StepKind::Terminate,
        _ => return None,
    })
}

async fn get_stack(State(coordinator): State<AppState>) -> Response {
    match coordinator.get_stack().await {
        Ok(stack) => ok(json!(stack)),
        Err(e) => err(e),
    }
}

#[derive(Deserialize)]
struct VariablesQuery {
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
}

async fn get_variables(
    State(coordinator): State<AppState>,
    Query(q): Query<VariablesQuery>,
) -> Response {
    match coordinator.get_variables(q.parent_id.as_deref()).await {
        Ok(vars) => ok(json!(vars)),
        Err(e) => err(e),
    }
}

fn ok(data: Value) -> Response {
    (StatusCode::OK, Json(json!({"success": true, "data": data}))).into_response()
}

fn err(e: Error) -> Response {
    let status = match &e {
        Error::InvalidArgument(_) | Error::Malformed(_) => StatusCode::BAD_REQUEST,
        Error::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::Cancelled(_) => StatusCode::REQUEST_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({"success": false, "error": e.to_string(), "kind": e.kind_tag()})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_known_step_kinds() {
        for wire in [
            "stepInto",
            "stepOver",
            "stepReturn",
            "stepContinue",
            "stepRunToLine",
            "stepJumpToLine",
            "terminate",
        ] {
            assert!(parse_step_kind(wire).is_some(), "{wire} should parse");
        }
        assert!(parse_step_kind("bogus").is_none());
    }
}
