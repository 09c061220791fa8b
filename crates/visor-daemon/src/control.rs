//! Control channel between the I/O surfaces and the loop task.
//!
//! HTTP and WS handlers never touch pipeline state directly: every
//! mutation travels this channel as a message and is applied at the top
//! of a tick, FIFO with the events. Commands that need an answer carry
//! a oneshot reply.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use visor_engine::{AppError, EffectError, Event, MirrorMode, QueryError};

/// Everything the loop task can be asked to do from outside.
#[derive(Debug)]
pub enum Control {
    /// A validated event for the next tick's drain.
    Event(Event),
    Activate {
        name: String,
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    GetActiveApp {
        reply: oneshot::Sender<Option<String>>,
    },
    AddEffect {
        name: String,
        params: Value,
        reply: oneshot::Sender<Result<String, EffectError>>,
    },
    RemoveEffect {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    ClearEffects {
        reply: oneshot::Sender<()>,
    },
    ListEffects {
        reply: oneshot::Sender<Vec<(String, String)>>,
    },
    /// Snapshot the active effects' public parameters.
    SaveEffects {
        reply: oneshot::Sender<Vec<(String, Value)>>,
    },
    /// Recreate effects from a previously saved snapshot.
    RestoreEffects {
        params: Vec<(String, Value)>,
        reply: oneshot::Sender<()>,
    },
    SetMirror {
        mode: MirrorMode,
        reply: oneshot::Sender<()>,
    },
    GetMirror {
        reply: oneshot::Sender<MirrorMode>,
    },
    SetBrightness {
        level: u8,
        reply: oneshot::Sender<()>,
    },
    /// Query an app by name. `None` reply means the app is unknown.
    Query {
        app: String,
        name: String,
        payload: Value,
        reply: oneshot::Sender<Option<Result<Value, QueryError>>>,
    },
}

pub type ControlSender = mpsc::UnboundedSender<Control>;
pub type ControlReceiver = mpsc::UnboundedReceiver<Control>;

pub fn channel() -> (ControlSender, ControlReceiver) {
    mpsc::unbounded_channel()
}
