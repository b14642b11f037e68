//! HTTP handlers.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use slotwatch_core::{Service, Topic};
use slotwatch_engine::EngineError;

use crate::dates::format_appointments;
use crate::server::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "Slotwatch",
        "status": "ok",
    }))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub async fn readyz() -> Json<Value> {
    Json(json!({"status": "ready"}))
}

/// Runs one poll tick. The external scheduler is responsible for not
/// overlapping invocations.
///
/// Completion is `204` whether or not anything was notified; only an
/// unhandled engine failure surfaces as `500`.
pub async fn run_poll(State(state): State<AppState>) -> Response {
    match state.orchestrator().run_tick().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Poll tick failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Poll tick failed")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub token: String,
    pub topic: String,
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Response {
    let topic = match Topic::parse(&req.topic) {
        Ok(topic) => topic,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    match state.subscriptions().subscribe(&req.token, &topic).await {
        Ok(id) => (StatusCode::CREATED, Json(json!({"id": id}))).into_response(),
        Err(e) => engine_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct TopicQuery {
    pub topic: String,
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TopicQuery>,
) -> Response {
    let topic = match Topic::parse(&query.topic) {
        Ok(topic) => topic,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    match state.subscriptions().unsubscribe(&topic, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => engine_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// Current watches of one device, as a topic → subscription id mapping.
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Response {
    match state
        .subscriptions()
        .subscriptions_for_token(&query.token)
        .await
    {
        Ok(mapping) => {
            let mapping: HashMap<String, String> = mapping
                .into_iter()
                .map(|(topic, id)| (topic.as_str().to_string(), id))
                .collect();
            Json(mapping).into_response()
        }
        Err(e) => engine_error_response(e),
    }
}

pub async fn list_services(State(state): State<AppState>) -> Json<Vec<Service>> {
    Json(state.directory().list_services().await)
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub id: String,
    pub name: String,
    pub appointments: Vec<String>,
    pub availability: String,
}

/// Locations of one service with their open slot dates and a display
/// summary.
pub async fn service_locations(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> Response {
    match state
        .directory()
        .service_locations(&service_id, state.prober())
        .await
    {
        Ok(locations) => {
            let body: Vec<LocationResponse> = locations
                .into_iter()
                .map(|loc| LocationResponse {
                    availability: format_appointments(&loc.appointments),
                    id: loc.id,
                    name: loc.name,
                    appointments: loc.appointments,
                })
                .collect();
            Json(body).into_response()
        }
        Err(e) => {
            tracing::warn!(service_id, error = %e, "Location listing failed");
            error_response(StatusCode::BAD_GATEWAY, "Location listing failed")
        }
    }
}

fn engine_error_response(err: EngineError) -> Response {
    match &err {
        EngineError::SubscriptionNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, &err.to_string())
        }
        _ if err.is_client_error() => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
        _ => {
            tracing::error!(error = %err, "Subscription operation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}
