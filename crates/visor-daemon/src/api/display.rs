//! Mirror mode control.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use visor_engine::MirrorMode;

use crate::api::{ask, ApiError, ApiState};
use crate::control::Control;

pub fn router() -> Router<ApiState> {
    Router::new().route("/mirror", get(get_mirror).post(set_mirror))
}

#[derive(Debug, Deserialize)]
struct SetMirrorRequest {
    mode: String,
}

async fn get_mirror(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let mode = ask(&state.ctrl, |reply| Control::GetMirror { reply }).await?;
    Ok(Json(json!({ "mirror_mode": mode.as_str() })))
}

async fn set_mirror(
    State(state): State<ApiState>,
    Json(request): Json<SetMirrorRequest>,
) -> Result<Json<Value>, ApiError> {
    let mode: MirrorMode = request.mode.parse().map_err(ApiError::bad_request)?;
    ask(&state.ctrl, |reply| Control::SetMirror { mode, reply }).await?;
    Ok(Json(json!({ "status": "ok", "mirror_mode": mode.as_str() })))
}
