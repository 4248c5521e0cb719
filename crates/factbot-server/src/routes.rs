//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use factbot_core::InboundMessage;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::context::ModerationContext;
use crate::queue::IntakeQueue;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<ModerationContext>,
    pub queue: IntakeQueue,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .route("/metrics", get(metrics))
        .route("/v1/messages", post(accept_message))
        .fallback(fallback)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ctx.stats())
}

async fn metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .metrics_handle
        .as_ref()
        .map(PrometheusHandle::render)
        .ok_or(AppError::MetricsDisabled)
}

/// Gateway callback: queue a message for moderation
async fn accept_message(
    State(state): State<AppState>,
    payload: Result<Json<InboundMessage>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(message) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let body = match state.queue.accept_message(message) {
        Some(pending) => json!({ "queued": true, "id": pending.id }),
        None => {
            debug!("bot-authored message ignored");
            json!({ "queued": false })
        }
    };

    Ok((StatusCode::ACCEPTED, Json(body)).into_response())
}

async fn fallback() -> Response {
    AppError::NotFound.into_response()
}

/// Application errors
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    MetricsDisabled,
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request_error", msg),
            AppError::MetricsDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "metrics recorder not installed".to_string(),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", "Not found".to_string()),
        };

        let body = json!({
            "error": {
                "message": message,
                "type": error_type,
            }
        });

        (status, Json(body)).into_response()
    }
}
