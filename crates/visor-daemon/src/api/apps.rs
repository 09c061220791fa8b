//! App listing, activation, and per-app queries.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use visor_engine::{validate_fields, QueryError};

use crate::api::{ask, ApiError, ApiState};
use crate::control::Control;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/available", get(available))
        .route("/active", get(active))
        .route("/activate/:name", post(activate))
        .route("/:app/query/:name", post(query))
}

async fn available(State(state): State<ApiState>) -> Json<Value> {
    let names: Vec<&str> = state.apps.iter().map(|a| a.name.as_str()).collect();
    Json(json!({ "available_apps": names }))
}

async fn active(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let name = ask(&state.ctrl, |reply| Control::GetActiveApp { reply }).await?;
    Ok(Json(json!({ "active_app": name })))
}

async fn activate(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let result = ask(&state.ctrl, |reply| Control::Activate {
        name: name.clone(),
        reply,
    })
    .await?;
    match result {
        Ok(()) => Ok(Json(json!({ "status": "ok", "active_app": name }))),
        Err(e) => Err(ApiError::not_found(e.to_string())),
    }
}

async fn query(
    State(state): State<ApiState>,
    Path((app, name)): Path<(String, String)>,
    payload: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    let payload = payload.map(|Json(v)| v).unwrap_or(Value::Null);

    let info = state
        .apps
        .iter()
        .find(|a| a.name == app)
        .ok_or_else(|| ApiError::not_found(format!("app '{app}' is not registered")))?;
    let spec = info
        .queries
        .iter()
        .find(|q| q.name == name)
        .ok_or_else(|| ApiError::not_implemented(format!("query '{name}' is not supported")))?;

    validate_fields(spec.input, &payload).map_err(ApiError::bad_request)?;

    let result = ask(&state.ctrl, |reply| Control::Query {
        app: app.clone(),
        name: name.clone(),
        payload,
        reply,
    })
    .await?;

    match result {
        None => Err(ApiError::not_found(format!("app '{app}' is not registered"))),
        Some(Ok(value)) => Ok(Json(value)),
        Some(Err(QueryError::Unsupported(q))) => {
            Err(ApiError::not_implemented(format!("query '{q}' is not supported")))
        }
        Some(Err(e @ QueryError::InvalidPayload { .. })) => {
            Err(ApiError::bad_request(e.to_string()))
        }
    }
}
