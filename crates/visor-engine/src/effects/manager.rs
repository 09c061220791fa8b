//! Ownership and lifecycle of active effects.

use log::{debug, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::effects::{Effect, EffectError, EffectKind, EFFECT_NAMES};
use crate::render::layer::Layer;

/// Owns the effects added through the control surface. Fade-capable
/// effects removed by request linger in fade-out until they report
/// finished; everything else is dropped immediately after its cleanup
/// hook ran against the cached layer list.
#[derive(Debug, Default)]
pub struct EffectManager {
    effects: Vec<Effect>,
    layers_cache: Vec<Layer>,
}

impl EffectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the effect types that can be added.
    pub fn available(&self) -> &'static [&'static str] {
        &EFFECT_NAMES
    }

    /// Create an effect from its name and JSON parameters. Returns the
    /// new effect's id.
    pub fn add_by_name(&mut self, name: &str, params: &Value) -> Result<String, EffectError> {
        let kind = EffectKind::from_name(name, params)?;
        Ok(self.add(kind))
    }

    /// Add a ready-made effect, assigning it a fresh id.
    pub fn add(&mut self, kind: EffectKind) -> String {
        let id = Uuid::new_v4().to_string();
        self.effects.push(Effect {
            id: id.clone(),
            kind,
        });
        id
    }

    /// Remove an effect by id. Fade-capable effects transition to
    /// fade-out instead and are reaped once finished. Returns whether
    /// the id was known.
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        let Some(idx) = self.effects.iter().position(|e| e.id == id) else {
            return false;
        };
        if self.effects[idx].supports_fade_out() && !self.effects[idx].is_stopping() {
            self.effects[idx].begin_fade_out();
            return true;
        }
        let mut effect = self.effects.remove(idx);
        effect.cleanup(&mut self.layers_cache);
        true
    }

    /// Remove all effects; fade-capable ones fade out first.
    pub fn clear(&mut self) {
        let mut kept = Vec::new();
        for mut effect in self.effects.drain(..) {
            if effect.supports_fade_out() {
                if !effect.is_stopping() {
                    effect.begin_fade_out();
                }
                kept.push(effect);
            } else {
                effect.cleanup(&mut self.layers_cache);
            }
        }
        self.effects = kept;
    }

    /// Drop effects whose fade-out completed, running their cleanup.
    pub fn reap_finished(&mut self) {
        let mut i = 0;
        while i < self.effects.len() {
            if self.effects[i].is_finished() {
                let mut effect = self.effects.remove(i);
                debug!("effect {} ({}) finished", effect.id, effect.name());
                effect.cleanup(&mut self.layers_cache);
            } else {
                i += 1;
            }
        }
    }

    /// Move the active effects out for a render pass. The caller must
    /// hand them back with [`reclaim`](Self::reclaim) so accumulated
    /// state (phases, RNG, fades) survives.
    pub fn lend(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn reclaim(&mut self, effects: Vec<Effect>) {
        self.effects = effects;
    }

    /// `(id, name)` pairs of the active effects.
    pub fn list(&self) -> Vec<(String, &'static str)> {
        self.effects
            .iter()
            .map(|e| (e.id.clone(), e.name()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Snapshot `(name, params)` pairs for later restoration. Hidden
    /// state never appears here.
    pub fn save_params(&self) -> Vec<(String, Value)> {
        self.effects
            .iter()
            .map(|e| (e.name().to_string(), e.kind.params()))
            .collect()
    }

    /// Recreate effects from a saved parameter list.
    pub fn restore(&mut self, saved: &[(String, Value)]) {
        for (name, params) in saved {
            if let Err(e) = self.add_by_name(name, params) {
                warn!("could not restore effect '{name}': {e}");
            }
        }
    }

    /// Refresh the layer list handed to cleanup hooks on removal.
    pub fn update_layers_cache(&mut self, layers: Vec<Layer>) {
        self.layers_cache = layers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::frame::Frame;
    use serde_json::{json, Value};

    #[test]
    fn add_and_list() {
        let mut mgr = EffectManager::new();
        let id = mgr.add_by_name("Dizzy", &Value::Null).unwrap();
        let list = mgr.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].0, id);
        assert_eq!(list[0].1, "Dizzy");
    }

    #[test]
    fn unknown_name_is_rejected() {
        let mut mgr = EffectManager::new();
        assert!(mgr.add_by_name("Nope", &Value::Null).is_err());
    }

    #[test]
    fn immediate_removal_for_non_fading_effects() {
        let mut mgr = EffectManager::new();
        let id = mgr.add_by_name("Shake", &Value::Null).unwrap();
        assert!(mgr.remove_by_id(&id));
        assert!(mgr.is_empty());
        assert!(!mgr.remove_by_id(&id));
    }

    #[test]
    fn fade_capable_effect_lingers_until_finished() {
        let mut mgr = EffectManager::new();
        let id = mgr
            .add_by_name("Rainbow", &json!({"fade_out_duration": 0.1}))
            .unwrap();
        assert!(mgr.remove_by_id(&id));
        // Still present, now fading out.
        assert_eq!(mgr.list().len(), 1);

        // Drive it to completion through a render pass.
        let mut lent = mgr.lend();
        let mut frame = Frame::new(2, 2);
        frame.fill([255, 255, 255]);
        for effect in &mut lent {
            effect.apply_post(&mut frame, 1.0);
        }
        mgr.reclaim(lent);
        mgr.reap_finished();
        assert!(mgr.is_empty());
    }

    #[test]
    fn save_and_restore_roundtrip() {
        let mut mgr = EffectManager::new();
        mgr.add_by_name("Shake", &json!({"amplitude": 7.0})).unwrap();
        mgr.add_by_name("Rainbow", &Value::Null).unwrap();
        let saved = mgr.save_params();

        let mut fresh = EffectManager::new();
        fresh.restore(&saved);
        let names: Vec<_> = fresh.list().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["Shake", "Rainbow"]);
        let amplitude = fresh
            .iter()
            .find_map(|e| match &e.kind {
                EffectKind::Shake(s) => Some(s.amplitude),
                _ => None,
            })
            .unwrap();
        assert_eq!(amplitude, 7.0);
    }

    #[test]
    fn clear_keeps_only_fading_effects() {
        let mut mgr = EffectManager::new();
        mgr.add_by_name("Shake", &Value::Null).unwrap();
        mgr.add_by_name("Rainbow", &Value::Null).unwrap();
        mgr.clear();
        let list = mgr.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].1, "Rainbow");
    }
}
