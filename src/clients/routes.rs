//! REST endpoints for client records and the follow-up pipeline.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::MutationError;
use crate::followup::FollowUp;

use super::model::NewClient;
use super::service::{ClientService, DeleteOutcome, TaskUpdate};

/// Shared state for client routes.
#[derive(Clone)]
pub struct ClientRouteState {
    pub service: Arc<ClientService>,
}

/// Body for the follow-up override endpoint. `"task": null` marks
/// onboarding complete.
#[derive(Debug, Deserialize)]
struct SetTaskRequest {
    task: FollowUp,
}

/// Build the client REST routes.
pub fn client_routes(service: Arc<ClientService>) -> Router {
    let state = ClientRouteState { service };

    Router::new()
        .route("/health", get(health))
        .route("/api/clients", get(list_clients).post(create_client))
        .route("/api/clients/{id}", get(get_client).delete(delete_client))
        .route("/api/clients/{id}/complete-task", post(complete_task))
        .route("/api/clients/{id}/follow-up", put(set_follow_up))
        .route("/api/clients/{id}/events", get(list_events))
        .with_state(state)
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "clienthub"
    }))
}

async fn list_clients(State(state): State<ClientRouteState>) -> impl IntoResponse {
    match state.service.list().await {
        Ok(clients) => (StatusCode::OK, Json(serde_json::json!(clients))),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn get_client(
    State(state): State<ClientRouteState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(&id) else {
        return failure(StatusCode::BAD_REQUEST, format!("Invalid client id: {id}"));
    };
    match state.service.get(id).await {
        Ok(Some(client)) => (StatusCode::OK, Json(serde_json::json!(client))),
        Ok(None) => failure(StatusCode::NOT_FOUND, "Client not found."),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn create_client(
    State(state): State<ClientRouteState>,
    body: Result<Json<NewClient>, JsonRejection>,
) -> impl IntoResponse {
    let Json(new) = match body {
        Ok(json) => json,
        Err(rejection) => {
            return failure(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid client payload: {rejection}"),
            );
        }
    };
    match state.service.create(&new).await {
        Ok(client) => (StatusCode::CREATED, Json(serde_json::json!(client))),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn complete_task(
    State(state): State<ClientRouteState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(&id) else {
        return failure(StatusCode::BAD_REQUEST, format!("Invalid client id: {id}"));
    };
    match state.service.complete_current_task(id).await {
        Ok(update) => task_updated(update),
        Err(e) => mutation_failure(&e),
    }
}

async fn set_follow_up(
    State(state): State<ClientRouteState>,
    Path(id): Path<String>,
    body: Result<Json<SetTaskRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(&id) else {
        return failure(StatusCode::BAD_REQUEST, format!("Invalid client id: {id}"));
    };
    // A label outside the closed enumeration never reaches the state
    // machine; it dies here as a deserialization rejection.
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => {
            return failure(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid follow-up task: {rejection}"),
            );
        }
    };
    match state.service.set_task(id, request.task).await {
        Ok(update) => task_updated(update),
        Err(e) => mutation_failure(&e),
    }
}

async fn delete_client(
    State(state): State<ClientRouteState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(&id) else {
        return failure(StatusCode::BAD_REQUEST, format!("Invalid client id: {id}"));
    };
    match state.service.delete(id).await {
        Ok(outcome) => {
            let message = match outcome {
                DeleteOutcome::Deleted => "Client deleted.",
                DeleteOutcome::AlreadyDeleted => "Client already deleted.",
            };
            (
                StatusCode::OK,
                Json(serde_json::json!({ "success": true, "message": message })),
            )
        }
        Err(e) => mutation_failure(&e),
    }
}

async fn list_events(
    State(state): State<ClientRouteState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(&id) else {
        return failure(StatusCode::BAD_REQUEST, format!("Invalid client id: {id}"));
    };
    match state.service.events(id).await {
        Ok(events) => (StatusCode::OK, Json(serde_json::json!(events))),
        Err(e) => mutation_failure(&e),
    }
}

// ── Response helpers ────────────────────────────────────────────────────

fn task_updated(update: TaskUpdate) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "nextFollowUp": update.follow_up,
            "newOnboardingStatus": update.status,
        })),
    )
}

fn failure(code: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (
        code,
        Json(serde_json::json!({ "success": false, "message": message.into() })),
    )
}

fn mutation_failure(err: &MutationError) -> (StatusCode, Json<serde_json::Value>) {
    let code = match err {
        MutationError::NotFound => StatusCode::NOT_FOUND,
        MutationError::AlreadyComplete | MutationError::AutomaticTask(_) => StatusCode::BAD_REQUEST,
        MutationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    failure(code, err.to_string())
}
