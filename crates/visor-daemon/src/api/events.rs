//! Event emission and type listings.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use visor_engine::{EventError, FieldSpec};

use crate::api::{ApiError, ApiState};
use crate::control::Control;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/emit/:name", post(emit))
        .route("/types", get(types))
}

async fn emit(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    payload: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    let payload = payload.map(|Json(v)| v).unwrap_or(Value::Null);

    let event = state.registry.validate(&name, payload).map_err(|e| match e {
        EventError::Unknown(_) => ApiError::not_found(e.to_string()),
        EventError::InvalidPayload { .. } => ApiError::bad_request(e.to_string()),
    })?;

    state
        .ctrl
        .send(Control::Event(event))
        .map_err(|_| ApiError::unavailable())?;
    Ok(Json(json!({ "status": "ok", "event": name })))
}

fn fields_json(fields: &[FieldSpec]) -> Value {
    Value::Array(
        fields
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "type": f.kind.as_str(),
                    "required": f.required,
                })
            })
            .collect(),
    )
}

/// Registered events and queries, grouped by app.
async fn types(State(state): State<ApiState>) -> Json<Value> {
    let mut events = Map::new();
    let mut queries = Map::new();

    for app in state.apps.iter() {
        if !app.events.is_empty() {
            let listed: Vec<Value> = app
                .events
                .iter()
                .map(|e| json!({ "name": e.name, "fields": fields_json(e.fields) }))
                .collect();
            events.insert(app.name.clone(), Value::Array(listed));
        }
        if !app.queries.is_empty() {
            let listed: Vec<Value> = app
                .queries
                .iter()
                .map(|q| {
                    json!({
                        "name": q.name,
                        "input": fields_json(q.input),
                        "output": fields_json(q.output),
                    })
                })
                .collect();
            queries.insert(app.name.clone(), Value::Array(listed));
        }
    }

    Json(json!({ "events": events, "queries": queries }))
}
