//! Effect lifecycle endpoints.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use visor_engine::effects::{all_metadata, EFFECT_NAMES};
use visor_engine::EffectError;

use crate::api::{ask, ApiError, ApiState};
use crate::control::Control;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/add", post(add))
        .route("/clear", delete(clear))
        .route("/:id", delete(remove))
        .route("/active", get(active))
        .route("/available", get(available))
        .route("/metadata", get(metadata))
        .route("/save", get(save))
        .route("/restore", post(restore))
}

#[derive(Debug, Deserialize)]
struct AddEffectRequest {
    effect_name: String,
    #[serde(default)]
    params: Value,
}

async fn add(
    State(state): State<ApiState>,
    Json(request): Json<AddEffectRequest>,
) -> Result<Json<Value>, ApiError> {
    let result = ask(&state.ctrl, |reply| Control::AddEffect {
        name: request.effect_name.clone(),
        params: request.params,
        reply,
    })
    .await?;

    match result {
        Ok(id) => Ok(Json(json!({
            "status": "ok",
            "effect_id": id,
            "effect_type": request.effect_name,
        }))),
        Err(e @ EffectError::Unknown(_)) => Err(ApiError::not_found(e.to_string())),
        Err(e @ EffectError::InvalidParams { .. }) => Err(ApiError::bad_request(e.to_string())),
    }
}

async fn clear(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    ask(&state.ctrl, |reply| Control::ClearEffects { reply }).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn remove(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = ask(&state.ctrl, |reply| Control::RemoveEffect {
        id: id.clone(),
        reply,
    })
    .await?;
    if !removed {
        return Err(ApiError::not_found(format!("effect '{id}' is not active")));
    }
    Ok(Json(json!({ "status": "ok", "effect_id": id })))
}

async fn active(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let list = ask(&state.ctrl, |reply| Control::ListEffects { reply }).await?;
    let effects: Vec<Value> = list
        .into_iter()
        .map(|(id, name)| json!({ "id": id, "name": name }))
        .collect();
    Ok(Json(json!({ "count": effects.len(), "effects": effects })))
}

async fn available() -> Json<Value> {
    Json(json!({ "effects": EFFECT_NAMES, "count": EFFECT_NAMES.len() }))
}

async fn metadata() -> Json<Value> {
    Json(json!({ "effects": all_metadata() }))
}

/// One effect in a saved snapshot: its type name and public parameters.
#[derive(Debug, Serialize, Deserialize)]
struct SavedEffect {
    name: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RestoreRequest {
    effects: Vec<SavedEffect>,
}

async fn save(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let saved = ask(&state.ctrl, |reply| Control::SaveEffects { reply }).await?;
    let effects: Vec<SavedEffect> = saved
        .into_iter()
        .map(|(name, params)| SavedEffect { name, params })
        .collect();
    Ok(Json(json!({ "count": effects.len(), "effects": effects })))
}

async fn restore(
    State(state): State<ApiState>,
    Json(request): Json<RestoreRequest>,
) -> Result<Json<Value>, ApiError> {
    let count = request.effects.len();
    let params: Vec<(String, Value)> = request
        .effects
        .into_iter()
        .map(|e| (e.name, e.params))
        .collect();
    ask(&state.ctrl, |reply| Control::RestoreEffects { params, reply }).await?;
    Ok(Json(json!({ "status": "ok", "count": count })))
}
