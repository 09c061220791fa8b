//! Effects: pre-effects mutate layer parameters before rasterization,
//! post-effects rewrite the rasterized frame.
//!
//! Each variant carries its public parameters (serde-visible) plus
//! hidden mutable state (`#[serde(skip)]`), so saving and restoring
//! parameters never captures phase or RNG state.

mod color_override;
mod dizzy;
mod manager;
mod rainbow;
pub mod rng;
mod shake;
mod wiggle;

pub use color_override::ColorOverrideEffect;
pub use dizzy::DizzyEffect;
pub use manager::EffectManager;
pub use rainbow::{FadeState, RainbowEffect, RainbowSync};
pub use rng::Rng;
pub use shake::ShakeEffect;
pub use wiggle::WiggleEffect;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::render::frame::Frame;
use crate::render::layer::Layer;

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("unknown effect '{0}'")]
    Unknown(String),
    #[error("invalid parameters for effect '{name}': {reason}")]
    InvalidParams { name: String, reason: String },
}

/// The effect variants, as a tagged union dispatched with `match`.
#[derive(Debug, Clone)]
pub enum EffectKind {
    Wiggle(WiggleEffect),
    Dizzy(DizzyEffect),
    Rainbow(RainbowEffect),
    Shake(ShakeEffect),
    ColorOverride(ColorOverrideEffect),
}

/// Names of every registered effect, in metadata order.
pub const EFFECT_NAMES: [&str; 5] = ["Wiggle", "Dizzy", "Rainbow", "Shake", "ColorOverride"];

impl EffectKind {
    /// Build an effect from its registered name and a JSON parameter
    /// object (`null` or `{}` for defaults).
    pub fn from_name(name: &str, params: &Value) -> Result<Self, EffectError> {
        fn parse<T: Default + serde::de::DeserializeOwned>(
            name: &str,
            params: &Value,
        ) -> Result<T, EffectError> {
            if params.is_null() {
                return Ok(T::default());
            }
            serde_json::from_value(params.clone()).map_err(|e| EffectError::InvalidParams {
                name: name.to_string(),
                reason: e.to_string(),
            })
        }

        match name {
            "Wiggle" => Ok(EffectKind::Wiggle(parse(name, params)?)),
            "Dizzy" => Ok(EffectKind::Dizzy(parse(name, params)?)),
            "Rainbow" => Ok(EffectKind::Rainbow(parse(name, params)?)),
            "Shake" => Ok(EffectKind::Shake(parse(name, params)?)),
            "ColorOverride" => Ok(EffectKind::ColorOverride(parse(name, params)?)),
            other => Err(EffectError::Unknown(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Wiggle(_) => "Wiggle",
            EffectKind::Dizzy(_) => "Dizzy",
            EffectKind::Rainbow(_) => "Rainbow",
            EffectKind::Shake(_) => "Shake",
            EffectKind::ColorOverride(_) => "ColorOverride",
        }
    }

    /// Public parameters as JSON (hidden state omitted by serde).
    pub fn params(&self) -> Value {
        fn ser<T: Serialize>(v: &T) -> Value {
            serde_json::to_value(v).unwrap_or(Value::Null)
        }
        match self {
            EffectKind::Wiggle(e) => ser(e),
            EffectKind::Dizzy(e) => ser(e),
            EffectKind::Rainbow(e) => ser(e),
            EffectKind::Shake(e) => ser(e),
            EffectKind::ColorOverride(e) => ser(e),
        }
    }

    /// Whether this effect runs before rasterization.
    pub fn is_pre(&self) -> bool {
        matches!(self, EffectKind::Wiggle(_))
    }
}

/// An effect instance: a unique string id plus the variant payload.
/// Ids are assigned by the `EffectManager`; effects embedded directly
/// in an app's description keep an empty id.
#[derive(Debug, Clone)]
pub struct Effect {
    pub id: String,
    pub kind: EffectKind,
}

impl Effect {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            id: String::new(),
            kind,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Run a pre-effect over the layer list. No-op for post-effects.
    pub fn apply_pre(&mut self, layers: &mut [Layer], dt: f32, tick: u64) {
        if let EffectKind::Wiggle(e) = &mut self.kind {
            e.apply(layers, dt, tick);
        }
    }

    /// Run a post-effect over the rasterized frame. No-op for
    /// pre-effects.
    pub fn apply_post(&mut self, frame: &mut Frame, dt: f32) {
        match &mut self.kind {
            EffectKind::Wiggle(_) => {}
            EffectKind::Dizzy(e) => e.apply(frame, dt),
            EffectKind::Rainbow(e) => e.apply(frame, dt),
            EffectKind::Shake(e) => e.apply(frame, dt),
            EffectKind::ColorOverride(e) => e.apply(frame, dt),
        }
    }

    /// Restore any per-layer mutation this effect performed.
    pub fn cleanup(&mut self, layers: &mut [Layer]) {
        if let EffectKind::Wiggle(e) = &mut self.kind {
            e.cleanup(layers);
        }
    }

    /// Whether removal should fade the effect out instead of dropping it.
    pub fn supports_fade_out(&self) -> bool {
        matches!(self.kind, EffectKind::Rainbow(_))
    }

    pub fn begin_fade_out(&mut self) {
        if let EffectKind::Rainbow(e) = &mut self.kind {
            e.begin_fade_out();
        }
    }

    pub fn is_stopping(&self) -> bool {
        match &self.kind {
            EffectKind::Rainbow(e) => e.is_stopping(),
            _ => false,
        }
    }

    /// A fade-out-capable effect reports finished once its fade
    /// completes; everything else is removed immediately.
    pub fn is_finished(&self) -> bool {
        match &self.kind {
            EffectKind::Rainbow(e) => e.is_finished(),
            _ => false,
        }
    }
}

/// One parameter in an effect's metadata listing.
#[derive(Debug, Clone, Serialize)]
pub struct EffectParamInfo {
    pub name: String,
    pub kind: &'static str,
    pub default: Value,
}

/// Metadata for one effect type: name plus its public parameters with
/// defaults, derived from the variant's `Default` serialization.
#[derive(Debug, Clone, Serialize)]
pub struct EffectMetadata {
    pub name: &'static str,
    pub params: Vec<EffectParamInfo>,
}

/// Metadata for every registered effect.
pub fn all_metadata() -> Vec<EffectMetadata> {
    EFFECT_NAMES
        .iter()
        .map(|&name| {
            let defaults = EffectKind::from_name(name, &Value::Null)
                .map(|k| k.params())
                .unwrap_or(Value::Null);
            let params = match &defaults {
                Value::Object(map) => map
                    .iter()
                    .map(|(k, v)| EffectParamInfo {
                        name: k.clone(),
                        kind: json_param_kind(v),
                        default: v.clone(),
                    })
                    .collect(),
                _ => Vec::new(),
            };
            EffectMetadata { name, params }
        })
        .collect()
}

fn json_param_kind(v: &Value) -> &'static str {
    match v {
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_u64() || n.is_i64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(items) if items.len() == 3 || items.len() == 4 => "color",
        Value::Array(_) => "array",
        _ => "any",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_name_defaults_and_overrides() {
        let kind = EffectKind::from_name("Rainbow", &Value::Null).unwrap();
        assert_eq!(kind.name(), "Rainbow");

        let kind = EffectKind::from_name("Shake", &json!({"amplitude": 5.0})).unwrap();
        match kind {
            EffectKind::Shake(s) => assert_eq!(s.amplitude, 5.0),
            _ => panic!("expected shake"),
        }
    }

    #[test]
    fn unknown_effect_is_rejected() {
        let err = EffectKind::from_name("Sparkle", &Value::Null).unwrap_err();
        assert!(matches!(err, EffectError::Unknown(_)));
    }

    #[test]
    fn params_hide_internal_state() {
        let kind = EffectKind::from_name("Rainbow", &Value::Null).unwrap();
        let params = kind.params();
        let map = params.as_object().unwrap();
        assert!(map.contains_key("speed"));
        assert!(!map.contains_key("phase"));
        assert!(!map.contains_key("fade_progress"));
    }

    #[test]
    fn metadata_covers_every_effect() {
        let meta = all_metadata();
        assert_eq!(meta.len(), EFFECT_NAMES.len());
        let wiggle = meta.iter().find(|m| m.name == "Wiggle").unwrap();
        assert!(wiggle.params.iter().any(|p| p.name == "amplitude"));
    }

    #[test]
    fn only_rainbow_fades_out() {
        let rainbow = Effect::new(EffectKind::from_name("Rainbow", &Value::Null).unwrap());
        let dizzy = Effect::new(EffectKind::from_name("Dizzy", &Value::Null).unwrap());
        assert!(rainbow.supports_fade_out());
        assert!(!dizzy.supports_fade_out());
    }
}
