//! HTTP control plane.
//!
//! Handlers validate at the boundary (400 for bad payloads, 404 for
//! unknown names, 501 for unsupported queries) and forward everything
//! else to the loop task over the control channel.

mod apps;
mod brightness;
mod display;
mod effects;
mod events;

use std::sync::atomic::AtomicU8;
use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use visor_engine::{EventRegistry, EventType, QueryType};

use crate::control::{Control, ControlSender};
use crate::transport::WsHub;

/// Static description of one registered app, captured at startup for
/// the listing endpoints.
pub struct AppInfo {
    pub name: String,
    pub events: Vec<EventType>,
    pub queries: Vec<QueryType>,
}

#[derive(Clone)]
pub struct ApiState {
    pub ctrl: ControlSender,
    pub registry: Arc<EventRegistry>,
    pub apps: Arc<Vec<AppInfo>>,
    pub brightness: Arc<AtomicU8>,
    pub ws: Option<WsHub>,
}

/// Structured error body: `{"detail": "..."}` with the matching status.
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn not_implemented(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_IMPLEMENTED,
            detail: detail.into(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            detail: "control loop is not running".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Send a command to the loop and await its reply.
pub async fn ask<T>(
    ctrl: &ControlSender,
    build: impl FnOnce(oneshot::Sender<T>) -> Control,
) -> Result<T, ApiError> {
    let (tx, rx) = oneshot::channel();
    ctrl.send(build(tx)).map_err(|_| ApiError::unavailable())?;
    rx.await.map_err(|_| ApiError::unavailable())
}

pub fn router(state: ApiState) -> Router {
    let mut router = Router::new()
        .nest("/api/apps", apps::router())
        .nest("/api/effects", effects::router())
        .nest("/api/events", events::router())
        .nest("/api/display", display::router())
        .nest("/api/brightness", brightness::router());

    if state.ws.is_some() {
        router = router.route("/api/ws", get(ws_handler));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

async fn ws_handler(State(state): State<ApiState>, upgrade: WebSocketUpgrade) -> Response {
    match state.ws.clone() {
        Some(hub) => upgrade.on_upgrade(move |socket| async move { hub.handle_socket(socket).await }),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
