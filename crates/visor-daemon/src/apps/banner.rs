//! Static text banner. The text is settable over the event surface and
//! readable back through a query.

use serde_json::{json, Value};
use visor_engine::{
    App, Event, EventType, FieldKind, FieldSpec, FrameDescription, Layer, Query, QueryError,
    QueryType, RenderOutput, Rgba,
};

const SET_TEXT: EventType = EventType {
    name: "set_text",
    fields: &[
        FieldSpec::required("text", FieldKind::String),
        FieldSpec::optional("color", FieldKind::Color),
    ],
};

const GET_TEXT: QueryType = QueryType {
    name: "get_text",
    input: &[],
    output: &[FieldSpec::required("text", FieldKind::String)],
};

pub struct BannerApp {
    text: String,
    color: Rgba,
}

impl BannerApp {
    pub fn new() -> Self {
        Self {
            text: "visor".to_string(),
            color: Rgba::WHITE,
        }
    }
}

impl Default for BannerApp {
    fn default() -> Self {
        Self::new()
    }
}

impl App for BannerApp {
    fn name(&self) -> &str {
        "banner"
    }

    fn events(&self) -> Vec<EventType> {
        vec![SET_TEXT]
    }

    fn queries(&self) -> Vec<QueryType> {
        vec![GET_TEXT]
    }

    fn update(&mut self, _dt: f32, events: &[Event]) {
        for event in events.iter().filter(|e| e.name == SET_TEXT.name) {
            if let Some(text) = event.field("text").and_then(Value::as_str) {
                self.text = text.to_string();
            }
            match event.field("color") {
                Some(Value::String(hex)) => {
                    if let Ok(color) = visor_engine::parse_hex(hex) {
                        self.color = color;
                    }
                }
                Some(Value::Array(items)) if items.len() >= 3 => {
                    let channel = |i: usize| items[i].as_u64().unwrap_or(255) as u8;
                    let alpha = if items.len() > 3 { channel(3) } else { 255 };
                    self.color = Rgba::new(channel(0), channel(1), channel(2), alpha);
                }
                _ => {}
            }
        }
    }

    fn render(&mut self) -> Option<RenderOutput> {
        let mut desc = FrameDescription::new();
        desc.push_layer(Layer::text(self.text.clone(), 2.0, 10.0, 10.0, self.color));
        Some(desc.into())
    }

    fn handle_query(&mut self, query: &Query) -> Result<Value, QueryError> {
        match query.name.as_str() {
            "get_text" => Ok(json!({ "text": self.text })),
            other => Err(QueryError::Unsupported(other.to_string())),
        }
    }
}
