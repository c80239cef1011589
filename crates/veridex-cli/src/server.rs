//! HTTP surface of the responder.
//!
//! `POST /veridex` carries the claim; the caller's identity travels in the
//! `x-caller-identity` header and is checked before the body is read.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use veridex_core::{CallerIdentity, ClaimRequest, ClaimResponse};
use veridex_runtime::{Rejection, Responder, ServiceState};

/// Header carrying the caller's peer identity.
pub const CALLER_HEADER: &str = "x-caller-identity";

pub struct AppState {
    pub responder: Responder,
    pub service_state: watch::Receiver<ServiceState>,
}

impl AppState {
    pub fn new(responder: Responder, service_state: watch::Receiver<ServiceState>) -> Arc<Self> {
        Arc::new(Self {
            responder,
            service_state,
        })
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Blocked callers get a bare status with no body
    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { error: message }),
            )
                .into_response(),
        }
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Blocked => ApiError::Forbidden,
            Rejection::InvalidRequest(e) => ApiError::BadRequest(e.to_string()),
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/veridex", post(submit_claim))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn caller_identity(headers: &HeaderMap) -> Option<CallerIdentity> {
    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(CallerIdentity::new)
}

async fn submit_claim(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ClaimResponse>, ApiError> {
    let caller = caller_identity(&headers);

    // Unknown callers are turned away before their body is parsed
    match &caller {
        Some(id) if !state.responder.authorize(id).blocked => {}
        _ => return Err(ApiError::Forbidden),
    }

    let request: ClaimRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;

    let response = state.responder.respond(caller, request).await?;
    Ok(Json(response))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.responder.registry().snapshot();
    let service_state = *state.service_state.borrow();
    let handler = state.responder.handler();
    Json(json!({
        "status": "ok",
        "state": service_state.as_str(),
        "peers": snapshot.len(),
        "block": snapshot.block(),
        "registry_taken_at": snapshot.taken_at().to_rfc3339(),
        "backend": {
            "provider": handler.provider_name(),
            "ready": handler.backend_ready().await,
        },
    }))
}
