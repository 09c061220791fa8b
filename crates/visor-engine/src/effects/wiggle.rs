//! Wiggle pre-effect: coherent organic drift applied to sprite layers.
//!
//! A single global offset (two summed sinusoids along a slowly rotating
//! direction, with a smoothstepped amplitude envelope and a damped
//! random wander) is shared by every sprite; each sprite adds its own
//! small eased offset on top. Per-layer state is keyed by `LayerId` and
//! evicted after a timeout so layers that vanish between ticks don't
//! leak entries.

use std::collections::HashMap;
use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::effects::rng::Rng;
use crate::render::layer::{Layer, LayerId};

/// Seconds a per-layer entry may go unseen before eviction.
const STALE_LAYER_TIMEOUT: f32 = 1.0;

/// Largest single direction retarget, degrees.
const MAX_DIRECTION_DEVIATION_DEG: f32 = 30.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WiggleEffect {
    /// Maximum shift in pixels.
    pub amplitude: f32,
    /// Relative amplitude of the perpendicular component.
    pub lateral_ratio: f32,
    /// Bounds for the interval between direction retargets, seconds.
    pub direction_interval_min: f32,
    pub direction_interval_max: f32,
    pub seed: Option<u64>,
    #[serde(skip)]
    state: Option<WiggleState>,
}

impl Default for WiggleEffect {
    fn default() -> Self {
        Self {
            amplitude: 2.0,
            lateral_ratio: 0.45,
            direction_interval_min: 1.2,
            direction_interval_max: 2.6,
            seed: None,
            state: None,
        }
    }
}

#[derive(Debug, Clone)]
struct SpriteState {
    base: Vec2,
    last_applied: Vec2,
    local_offset: Vec2,
    local_target: Vec2,
    local_duration: f32,
    local_elapsed: f32,
    initialized: bool,
    last_seen: f32,
    last_update_time: f32,
}

#[derive(Debug, Clone)]
struct WiggleState {
    rng: Rng,
    direction: Vec2,
    direction_target: Vec2,
    direction_elapsed: f32,
    direction_duration: f32,
    phase_main: f32,
    phase_lateral: f32,
    freq_main: f32,
    freq_lateral: f32,
    amp_mod: f32,
    amp_mod_start: f32,
    amp_mod_target: f32,
    amp_mod_timer: f32,
    amp_mod_duration: f32,
    wander_center: Vec2,
    wander_velocity: Vec2,
    current_offset: Vec2,
    internal_time: f32,
    last_dt: f32,
    last_tick: Option<u64>,
    sprites: HashMap<LayerId, SpriteState>,
}

impl WiggleEffect {
    /// Apply the effect to every sprite layer in the list, mutating
    /// their positions in place. The `tick` counter guards against
    /// double-advancing the simulation when the same description is
    /// rendered more than once per tick (e.g. left/right pairs).
    pub fn apply(&mut self, layers: &mut [Layer], dt: f32, tick: u64) {
        if self.amplitude <= 0.0 || !layers.iter().any(Layer::is_sprite) {
            return;
        }

        let seed = self.seed;
        let state = self
            .state
            .get_or_insert_with(|| WiggleState::new(seed));

        if state.last_tick != Some(tick) {
            state.last_tick = Some(tick);
            state.internal_time += dt;
            state.last_dt = dt;

            let direction = state.advance_direction(dt, self.direction_interval_min, self.direction_interval_max);
            state.advance_global_offset(direction, dt, self.amplitude, self.lateral_ratio);
            state.evict_stale();
        }

        let now = state.internal_time;
        let step_dt = state.last_dt;
        let amplitude = self.amplitude;
        for layer in layers.iter_mut().filter(|l| l.is_sprite()) {
            state.apply_to_layer(layer, now, step_dt, amplitude);
        }
    }

    /// Restore every tracked sprite to its recorded baseline position
    /// and drop all per-layer state.
    pub fn cleanup(&mut self, layers: &mut [Layer]) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        for layer in layers.iter_mut().filter(|l| l.is_sprite()) {
            let Some(id) = layer.id() else { continue };
            if let Some(entry) = state.sprites.get(&id) {
                layer.set_position(entry.base.x, entry.base.y);
            }
        }
        state.sprites.clear();
    }
}

impl WiggleState {
    fn new(seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => Rng::new(s),
            None => Rng::from_time(),
        };
        let direction = random_unit(&mut rng);
        let direction_target = deviate(direction, &mut rng, MAX_DIRECTION_DEVIATION_DEG);
        Self {
            direction,
            direction_target,
            direction_elapsed: 0.0,
            direction_duration: 1.0,
            phase_main: rng.range(0.0, TAU),
            phase_lateral: rng.range(0.0, TAU),
            freq_main: rng.range(0.16, 0.24),
            freq_lateral: rng.range(0.22, 0.32),
            amp_mod: 0.0,
            amp_mod_start: 0.0,
            amp_mod_target: 0.0,
            amp_mod_timer: 0.0,
            amp_mod_duration: 1.0,
            wander_center: Vec2::ZERO,
            wander_velocity: Vec2::ZERO,
            current_offset: Vec2::ZERO,
            internal_time: 0.0,
            last_dt: 0.0,
            last_tick: None,
            sprites: HashMap::new(),
            rng,
        }
        .init_amp_mod()
    }

    fn init_amp_mod(mut self) -> Self {
        self.amp_mod = self.rng.range(0.75, 1.0);
        self.amp_mod_start = self.amp_mod;
        self.amp_mod_target = self.amp_mod;
        self.amp_mod_duration = self.rng.range(2.5, 4.5);
        self
    }

    fn advance_direction(&mut self, dt: f32, interval_min: f32, interval_max: f32) -> Vec2 {
        self.direction_elapsed += dt;
        let duration = self.direction_duration.max(1e-3);
        let progress = (self.direction_elapsed / duration).min(1.0);

        let blended = self.direction * (1.0 - progress) + self.direction_target * progress;
        let current = if blended.length() < 1e-5 {
            if self.direction_target.length() < 1e-5 {
                Vec2::X
            } else {
                self.direction_target.normalize()
            }
        } else {
            blended.normalize()
        };

        if progress >= 1.0 {
            self.direction = current;
            self.direction_target = deviate(current, &mut self.rng, MAX_DIRECTION_DEVIATION_DEG);
            self.direction_duration = choose_direction_interval(&mut self.rng, interval_min, interval_max);
            self.direction_elapsed = 0.0;
        }
        current
    }

    fn advance_global_offset(&mut self, direction: Vec2, dt: f32, amplitude: f32, lateral_ratio: f32) {
        self.advance_amp_mod(dt);
        self.advance_wander(dt, amplitude);

        let perp = perpendicular(direction);
        let base_amp = amplitude.max(0.0) * self.amp_mod;
        let lateral_amp = base_amp * lateral_ratio.max(0.0) * 0.7;

        self.phase_main += dt * self.freq_main * TAU;
        self.phase_lateral += dt * self.freq_lateral * TAU;

        let main_wave = self.phase_main.sin() * base_amp;
        let lateral_wave = self.phase_lateral.sin() * lateral_amp;

        let mut offset = self.wander_center + direction * main_wave + perp * lateral_wave;
        let max_len = (amplitude * 1.1).max(1e-3);
        if offset.length() > max_len {
            offset = offset.normalize() * max_len;
        }
        self.current_offset = offset;
    }

    fn advance_amp_mod(&mut self, dt: f32) {
        self.amp_mod_timer += dt;
        let duration = self.amp_mod_duration.max(1e-3);
        let progress = (self.amp_mod_timer / duration).min(1.0);
        let eased = smoothstep(progress);
        self.amp_mod = self.amp_mod_start * (1.0 - eased) + self.amp_mod_target * eased;

        if progress >= 1.0 {
            self.amp_mod_start = self.amp_mod;
            self.amp_mod_target = self.rng.range(0.7, 1.0);
            self.amp_mod_duration = self.rng.range(2.5, 4.5);
            self.amp_mod_timer = 0.0;
        }
    }

    fn advance_wander(&mut self, dt: f32, amplitude: f32) {
        let jitter = Vec2::new(self.rng.next_normal(), self.rng.next_normal()) * 0.45;
        let accel = jitter * amplitude.max(0.1) * 0.25;
        let damping = 1.6;

        self.wander_velocity += (accel - self.wander_velocity * damping) * dt;
        self.wander_center += self.wander_velocity * dt;

        let limit = (amplitude * 0.6).max(0.1);
        if self.wander_center.length() > limit {
            self.wander_center = self.wander_center.normalize() * limit;
        }
    }

    fn evict_stale(&mut self) {
        let now = self.internal_time;
        self.sprites
            .retain(|_, s| now - s.last_seen <= STALE_LAYER_TIMEOUT);
    }

    fn apply_to_layer(&mut self, layer: &mut Layer, now: f32, dt: f32, amplitude: f32) {
        let Some(id) = layer.id() else { return };
        let Some((x, y)) = layer.position() else { return };
        let current_pos = Vec2::new(x, y);
        let local_scale = amplitude.max(1.0);

        let rng = &mut self.rng;
        let entry = self.sprites.entry(id).or_insert_with(|| SpriteState {
            base: current_pos,
            last_applied: current_pos,
            local_offset: Vec2::ZERO,
            local_target: random_unit(rng) * rng.range(0.12, 0.35) * local_scale,
            local_duration: rng.range(1.8, 3.2),
            local_elapsed: 0.0,
            initialized: false,
            last_seen: now,
            last_update_time: -1.0,
        });
        entry.last_seen = now;

        // A position we didn't write means the layer moved externally:
        // re-anchor its baseline there.
        if entry.initialized && (current_pos - entry.last_applied).abs().max_element() > 1e-4 {
            entry.base = current_pos;
        }

        if entry.last_update_time != now {
            entry.last_update_time = now;
            entry.local_elapsed += dt;
            let duration = entry.local_duration.max(1e-3);
            let mut progress = entry.local_elapsed / duration;
            if progress >= 1.0 {
                entry.local_target = random_unit(rng) * rng.range(0.12, 0.35) * local_scale;
                entry.local_duration = rng.range(1.8, 3.2);
                entry.local_elapsed = 0.0;
                progress = 0.0;
            }
            entry.local_offset = entry.local_target * smoothstep(progress.min(1.0));
        }

        let new_pos = entry.base + self.current_offset + entry.local_offset;
        layer.set_position(new_pos.x, new_pos.y);
        entry.last_applied = new_pos;
        entry.initialized = true;
    }
}

fn choose_direction_interval(rng: &mut Rng, interval_min: f32, interval_max: f32) -> f32 {
    let base_min = interval_min.min(interval_max).max(1.4);
    let base_max = (interval_min.max(interval_max) * 1.2).max(base_min + 0.6);
    rng.range(base_min, base_max)
}

fn random_unit(rng: &mut Rng) -> Vec2 {
    let v = Vec2::new(rng.next_normal(), rng.next_normal());
    if v.length() < 1e-6 {
        Vec2::X
    } else {
        v.normalize()
    }
}

fn deviate(current: Vec2, rng: &mut Rng, max_angle_deg: f32) -> Vec2 {
    let max_rad = max_angle_deg.to_radians();
    let offset = rng.range(-max_rad, max_rad);
    let angle = current.y.atan2(current.x) + offset;
    Vec2::new(angle.cos(), angle.sin())
}

fn perpendicular(direction: Vec2) -> Vec2 {
    let perp = Vec2::new(-direction.y, direction.x);
    if perp.length() < 1e-6 {
        Vec2::Y
    } else {
        perp.normalize()
    }
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
