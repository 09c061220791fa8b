pub mod app;
pub mod color;
pub mod display;
pub mod effects;
pub mod pipeline;
pub mod proto;
pub mod render;
pub mod strip;
pub mod transition;

// Re-export key types at crate root for convenience
pub use app::{
    validate_fields, App, AppError, AppManager, Event, EventError, EventRegistry, EventType,
    FieldKind, FieldSpec, Query, QueryError, QueryType,
};
pub use color::{hsv_to_rgb, parse_hex, Rgba};
pub use display::{DisplayManager, MirrorMode, HALF_WIDTH, PANEL_HEIGHT, PANEL_WIDTH};
pub use effects::{
    ColorOverrideEffect, DizzyEffect, Effect, EffectError, EffectKind, EffectManager, FadeState,
    RainbowEffect, RainbowSync, Rng, ShakeEffect, WiggleEffect,
};
pub use pipeline::{Pipeline, TickOutput};
pub use proto::{crc8, rle_decode, rle_encode, Packet, ProtoError};
pub use render::{
    AnimatedSpriteLayer, CompletionHook, Frame, FrameDescription, FrameSource, Layer, LayerId,
    RenderOutput, Renderer, SpriteLayer, SpritePixels, TextLayer,
};
pub use strip::LedStrip;
pub use transition::{
    calculate_image_similarity, cosine_interpolation, is_bright_to_dark, AnimatedParameter,
    DampedSpring, ImageView, InterpolationMethod, PartTransition, PartTransitionManager,
    RampFilter, TransitionEngine, TransitionType,
};
