//! The app contract and its plumbing.
//!
//! An app is a stateful producer of visual content: it consumes typed
//! events, answers typed queries, and renders a frame description (or a
//! prebuilt frame) each tick. Apps are registered statically at startup.

mod events;
mod manager;

pub use events::{
    validate_fields, Event, EventError, EventRegistry, EventType, FieldKind, FieldSpec, Query,
    QueryError, QueryType, BUTTON_EVENT, SYSTEM_APP,
};
pub use manager::{AppError, AppManager};

use serde_json::Value;

use crate::display::MirrorMode;
use crate::render::RenderOutput;

/// The contract every app fulfills. Called only from the main loop;
/// implementations are free to keep mutable state without locking.
pub trait App: Send {
    /// Unique app name.
    fn name(&self) -> &str;

    /// Event types this app consumes.
    fn events(&self) -> Vec<EventType> {
        Vec::new()
    }

    /// Query types this app answers.
    fn queries(&self) -> Vec<QueryType> {
        Vec::new()
    }

    /// Mirror mode applied to the display when this app activates.
    fn mirror_mode(&self) -> MirrorMode {
        MirrorMode::None
    }

    /// Called when the app becomes active.
    fn start(&mut self) {}

    /// Called when the app is deactivated.
    fn stop(&mut self) {}

    /// Advance internal state. `events` holds everything that arrived
    /// before this tick began, in order.
    fn update(&mut self, _dt: f32, _events: &[Event]) {}

    /// Produce this tick's visual output; `None` skips the tick.
    fn render(&mut self) -> Option<RenderOutput>;

    /// Answer a query. The default rejects everything as unsupported.
    fn handle_query(&mut self, query: &Query) -> Result<Value, QueryError> {
        Err(QueryError::Unsupported(query.name.clone()))
    }
}
