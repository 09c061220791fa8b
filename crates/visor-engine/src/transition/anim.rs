//! Animation primitives driving transitions: frame-counted ramps, a
//! damped spring, and the animated parameter composing them.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// How an animated parameter eases toward its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    Linear,
    #[default]
    Cosine,
    Bounce,
    Overshoot,
}

/// Moves a value toward a target by a fixed step per call; a full
/// transition takes `frames` calls.
#[derive(Debug, Clone)]
pub struct RampFilter {
    frames: u32,
    value: f32,
}

impl RampFilter {
    pub fn new(frames: u32) -> Self {
        Self { frames, value: 0.0 }
    }

    pub fn increment(&self) -> f32 {
        1.0 / self.frames.max(1) as f32
    }

    /// Step toward `target`, clamped to [0, 1].
    pub fn filter(&mut self, target: f32) -> f32 {
        let diff = target - self.value;
        if diff.abs() < self.increment() / 2.0 {
            return self.value;
        }
        if diff > 0.0 {
            self.value = (self.value + self.increment()).min(1.0);
        } else {
            self.value = (self.value - self.increment()).max(0.0);
        }
        self.value
    }

    pub fn reset(&mut self, value: f32) {
        self.value = value.clamp(0.0, 1.0);
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

/// Damped spring; lets a value overshoot its target and settle.
#[derive(Debug, Clone)]
pub struct DampedSpring {
    pub spring_constant: f32,
    pub damping: f32,
    position: f32,
    velocity: f32,
}

impl DampedSpring {
    pub fn new(spring_constant: f32, damping: f32) -> Self {
        Self {
            spring_constant,
            damping,
            position: 0.0,
            velocity: 0.0,
        }
    }

    pub fn calculate(&mut self, target: f32, dt: f32) -> f32 {
        // Huge steps destabilize the integration; skip them.
        if dt <= 0.0 || dt > 2.0 {
            return self.position;
        }
        let spring_force = -self.spring_constant * (self.position - target);
        let damping_force = -self.damping * self.velocity;
        let force = spring_force + damping_force;

        self.velocity += force * dt;
        self.position += self.velocity * dt;
        self.position
    }

    pub fn reset(&mut self, position: f32) {
        self.position = position;
        self.velocity = 0.0;
    }

    pub fn position(&self) -> f32 {
        self.position
    }
}

pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    start + (end - start) * t
}

/// Cosine interpolation: smooth start and end.
pub fn cosine_interpolation(start: f32, end: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let cos_t = (1.0 - (t * PI).cos()) / 2.0;
    start + (end - start) * cos_t
}

/// Eases to 70% of the way, then overshoots with a small sine bounce.
pub fn bounce_interpolation(start: f32, end: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.7 {
        let bounce_t = t / 0.7;
        cosine_interpolation(start, end, bounce_t)
    } else {
        let bounce_t = (t - 0.7) / 0.3;
        let overshoot = 0.1 * (bounce_t * PI).sin();
        end + (end - start) * overshoot
    }
}

pub fn interpolate(start: f32, end: f32, t: f32, method: InterpolationMethod) -> f32 {
    match method {
        InterpolationMethod::Linear => lerp(start, end, t),
        InterpolationMethod::Cosine => cosine_interpolation(start, end, t),
        InterpolationMethod::Bounce => bounce_interpolation(start, end, t),
        InterpolationMethod::Overshoot => lerp(start, end, t),
    }
}

/// A parameter animated between a basis and a goal. Ramp + easing for
/// most methods; the spring directly for `Overshoot`.
#[derive(Debug, Clone)]
pub struct AnimatedParameter {
    pub method: InterpolationMethod,
    ramp: RampFilter,
    spring: DampedSpring,
    basis: f32,
    goal: f32,
    current: f32,
    target: f32,
}

impl AnimatedParameter {
    pub fn new(frames: u32, method: InterpolationMethod) -> Self {
        Self {
            method,
            ramp: RampFilter::new(frames),
            spring: DampedSpring::new(15.0, 5.0),
            basis: 0.0,
            goal: 1.0,
            current: 0.0,
            target: 0.0,
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target.clamp(self.basis, self.goal);
    }

    /// Advance and return the current value in [basis, goal].
    pub fn update(&mut self, dt: f32) -> f32 {
        let span = (self.goal - self.basis).max(1e-4);
        let normalized_target = (self.target - self.basis) / span;

        if self.method == InterpolationMethod::Overshoot {
            self.current = self.spring.calculate(normalized_target, dt);
        } else {
            let filtered = self.ramp.filter(normalized_target);
            self.current = interpolate(0.0, 1.0, filtered, self.method);
        }
        self.value()
    }

    pub fn reset(&mut self, value: f32) {
        let span = (self.goal - self.basis).max(1e-4);
        let normalized = (value - self.basis) / span;
        self.ramp.reset(normalized);
        self.spring.reset(normalized);
        self.current = normalized;
        self.target = value;
    }

    pub fn value(&self) -> f32 {
        self.basis + (self.goal - self.basis) * self.current
    }
}
