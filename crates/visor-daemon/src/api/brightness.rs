//! Panel brightness control.

use std::sync::atomic::Ordering;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::api::{ask, ApiError, ApiState};
use crate::control::Control;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", get(get_brightness))
        .route("/:level", post(set_brightness))
}

async fn get_brightness(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({ "brightness": state.brightness.load(Ordering::Relaxed) }))
}

async fn set_brightness(
    State(state): State<ApiState>,
    Path(level): Path<u16>,
) -> Result<Json<Value>, ApiError> {
    let level: u8 = level
        .try_into()
        .map_err(|_| ApiError::bad_request("brightness level must be between 0 and 255"))?;
    ask(&state.ctrl, |reply| Control::SetBrightness { level, reply }).await?;
    Ok(Json(json!({ "brightness": level })))
}
