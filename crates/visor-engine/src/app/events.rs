//! Events and queries: named tagged records with payload validation at
//! the ingress boundary.
//!
//! Apps declare the event and query types they understand as field
//! specs; the registry validates submitted payloads before anything
//! reaches the queue, so the loop only ever sees well-formed events.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::color::parse_hex;

/// Built-in event emitted when the device reports a button press.
pub const BUTTON_EVENT: EventType = EventType {
    name: "button",
    fields: &[FieldSpec::required("button_id", FieldKind::Integer)],
};

/// Pseudo-app owning the built-in event types.
pub const SYSTEM_APP: &str = "system";

#[derive(Debug, Error)]
pub enum EventError {
    #[error("event '{0}' is not registered")]
    Unknown(String),
    #[error("invalid payload for event '{event}': {reason}")]
    InvalidPayload { event: String, reason: String },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query '{0}' is not supported")]
    Unsupported(String),
    #[error("invalid payload for query '{query}': {reason}")]
    InvalidPayload { query: String, reason: String },
}

/// Payload field types the contract can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Hex string (`#RRGGBB[AA]`) or an array of 3–4 channel values.
    Color,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Color => "color",
        }
    }
}

/// One field of an event or query payload.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Descriptor of an event type an app consumes.
#[derive(Debug, Clone, Copy)]
pub struct EventType {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

/// Descriptor of a query an app answers: input and output schemas.
#[derive(Debug, Clone, Copy)]
pub struct QueryType {
    pub name: &'static str,
    pub input: &'static [FieldSpec],
    pub output: &'static [FieldSpec],
}

/// A validated event instance.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub payload: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Convenience payload accessor.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

/// A query instance addressed to an app.
#[derive(Debug, Clone)]
pub struct Query {
    pub name: String,
    pub payload: Value,
}

impl Query {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Check a payload against a field-spec list. Extra keys are allowed;
/// missing required fields and wrong types are not.
pub fn validate_fields(fields: &[FieldSpec], payload: &Value) -> Result<(), String> {
    let map = match payload {
        Value::Object(map) => map,
        Value::Null if fields.iter().all(|f| !f.required) => return Ok(()),
        Value::Null => return Err("payload is required".to_string()),
        other => return Err(format!("expected an object, got {other}")),
    };

    for field in fields {
        match map.get(field.name) {
            None if field.required => return Err(format!("missing required field '{}'", field.name)),
            None => continue,
            Some(value) => {
                if !matches_kind(field.kind, value) {
                    return Err(format!(
                        "field '{}' must be a {}",
                        field.name,
                        field.kind.as_str()
                    ));
                }
            }
        }
    }
    Ok(())
}

fn matches_kind(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::String => value.is_string(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::Number => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Color => match value {
            Value::String(s) => parse_hex(s).is_ok(),
            Value::Array(items) => {
                (3..=4).contains(&items.len())
                    && items.iter().all(|v| v.as_u64().is_some_and(|n| n <= 255))
            }
            _ => false,
        },
    }
}

#[derive(Debug, Clone)]
struct RegisteredEvent {
    app: String,
    spec: EventType,
}

/// Maps event names to their specs and owning apps. Populated once at
/// startup from the static app registry; the built-in types are always
/// present.
#[derive(Debug, Default)]
pub struct EventRegistry {
    entries: HashMap<String, RegisteredEvent>,
}

impl EventRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.register(SYSTEM_APP, BUTTON_EVENT);
        registry
    }

    /// Register an event type. The first registration of a name wins.
    pub fn register(&mut self, app: &str, spec: EventType) {
        self.entries
            .entry(spec.name.to_string())
            .or_insert(RegisteredEvent {
                app: app.to_string(),
                spec,
            });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Validate a submitted payload into an `Event`.
    pub fn validate(&self, name: &str, payload: Value) -> Result<Event, EventError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| EventError::Unknown(name.to_string()))?;
        validate_fields(entry.spec.fields, &payload).map_err(|reason| {
            EventError::InvalidPayload {
                event: name.to_string(),
                reason,
            }
        })?;
        Ok(Event::new(name, payload))
    }

    /// `(app, event type)` pairs for the listing endpoints.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &EventType)> {
        self.entries.values().map(|e| (e.app.as_str(), &e.spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_EVENT: EventType = EventType {
        name: "set_text",
        fields: &[
            FieldSpec::required("text", FieldKind::String),
            FieldSpec::optional("color", FieldKind::Color),
        ],
    };

    fn registry() -> EventRegistry {
        let mut r = EventRegistry::new();
        r.register("banner", TEST_EVENT);
        r
    }

    #[test]
    fn unknown_event_rejected() {
        let err = registry().validate("warp", json!({})).unwrap_err();
        assert!(matches!(err, EventError::Unknown(_)));
    }

    #[test]
    fn missing_required_field_rejected() {
        let err = registry().validate("set_text", json!({})).unwrap_err();
        assert!(matches!(err, EventError::InvalidPayload { .. }));
    }

    #[test]
    fn valid_payload_accepted() {
        let event = registry()
            .validate("set_text", json!({"text": "hi", "color": "#FF0000"}))
            .unwrap();
        assert_eq!(event.name, "set_text");
        assert_eq!(event.field("text").unwrap(), "hi");
    }

    #[test]
    fn wrong_type_rejected() {
        let err = registry()
            .validate("set_text", json!({"text": 5}))
            .unwrap_err();
        assert!(matches!(err, EventError::InvalidPayload { .. }));
    }

    #[test]
    fn color_accepts_arrays_and_hex() {
        assert!(matches_kind(FieldKind::Color, &json!("#A0B0C0")));
        assert!(matches_kind(FieldKind::Color, &json!([1, 2, 3])));
        assert!(matches_kind(FieldKind::Color, &json!([1, 2, 3, 4])));
        assert!(!matches_kind(FieldKind::Color, &json!([1, 2])));
        assert!(!matches_kind(FieldKind::Color, &json!([1, 2, 300])));
        assert!(!matches_kind(FieldKind::Color, &json!("red")));
    }

    #[test]
    fn button_event_is_builtin() {
        let registry = EventRegistry::new();
        let event = registry.validate("button", json!({"button_id": 1})).unwrap();
        assert_eq!(event.field("button_id").unwrap(), 1);
    }

    #[test]
    fn null_payload_ok_when_nothing_required() {
        const PING: EventType = EventType {
            name: "ping",
            fields: &[],
        };
        let mut r = EventRegistry::new();
        r.register("misc", PING);
        assert!(r.validate("ping", Value::Null).is_ok());
    }
}
