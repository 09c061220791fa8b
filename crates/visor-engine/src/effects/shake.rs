//! Shake post-effect: whole-frame translation by a cached random offset.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::effects::rng::Rng;
use crate::render::frame::Frame;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeEffect {
    /// Maximum shift in pixels.
    pub amplitude: f32,
    /// Offset resamples per second.
    pub frequency: f32,
    pub seed: Option<u64>,
    #[serde(skip)]
    state: Option<ShakeState>,
}

#[derive(Debug, Clone)]
struct ShakeState {
    rng: Rng,
    offset: Vec2,
    elapsed: f32,
}

impl Default for ShakeEffect {
    fn default() -> Self {
        Self {
            amplitude: 2.0,
            frequency: 10.0,
            seed: None,
            state: None,
        }
    }
}

impl ShakeEffect {
    pub fn apply(&mut self, frame: &mut Frame, dt: f32) {
        if self.amplitude <= 0.001 {
            return;
        }

        let seed = self.seed;
        let state = self.state.get_or_insert_with(|| ShakeState {
            rng: match seed {
                Some(s) => Rng::new(s),
                None => Rng::from_time(),
            },
            offset: Vec2::ZERO,
            elapsed: 0.0,
        });

        let change_interval = 1.0 / self.frequency.max(0.1);
        state.elapsed += dt;
        if state.elapsed >= change_interval {
            state.elapsed -= change_interval;
            // ~N(0, A/3), clipped to ±A.
            let sigma = self.amplitude / 3.0;
            state.offset = Vec2::new(
                (state.rng.next_normal() * sigma).clamp(-self.amplitude, self.amplitude),
                (state.rng.next_normal() * sigma).clamp(-self.amplitude, self.amplitude),
            );
        }

        if frame.width() == 0 || frame.height() == 0 {
            return;
        }

        let offset_x = state.offset.x.round() as i64;
        let offset_y = state.offset.y.round() as i64;
        if offset_x == 0 && offset_y == 0 {
            return;
        }

        *frame = translate_with_black_fill(frame, offset_x, offset_y);
    }
}

/// Shift pixels by an integer offset; regions shifted in from outside
/// the frame are black.
pub fn translate_with_black_fill(frame: &Frame, offset_x: i64, offset_y: i64) -> Frame {
    let width = frame.width() as i64;
    let height = frame.height() as i64;
    let mut out = Frame::new(frame.width(), frame.height());

    for dy in 0..height {
        let sy = dy - offset_y;
        if sy < 0 || sy >= height {
            continue;
        }
        for dx in 0..width {
            let sx = dx - offset_x;
            if sx < 0 || sx >= width {
                continue;
            }
            out.set_pixel(dx as usize, dy as usize, frame.pixel(sx as usize, sy as usize));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_moves_and_black_fills() {
        let mut frame = Frame::new(3, 3);
        frame.set_pixel(0, 0, [255, 0, 0]);
        let out = translate_with_black_fill(&frame, 1, 1);
        assert_eq!(out.pixel(1, 1), [255, 0, 0]);
        assert_eq!(out.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn translate_negative_offsets() {
        let mut frame = Frame::new(3, 3);
        frame.set_pixel(2, 2, [0, 255, 0]);
        let out = translate_with_black_fill(&frame, -2, -2);
        assert_eq!(out.pixel(0, 0), [0, 255, 0]);
        assert_eq!(out.pixel(2, 2), [0, 0, 0]);
    }

    #[test]
    fn offset_is_cached_between_resamples() {
        let mut effect = ShakeEffect {
            seed: Some(5),
            frequency: 1.0,
            ..ShakeEffect::default()
        };
        let mut frame = Frame::new(4, 4);
        frame.set_pixel(2, 2, [9, 9, 9]);
        // Two short ticks within one resample interval see the same offset.
        effect.apply(&mut frame.clone(), 0.1);
        let first = effect.state.as_ref().map(|s| s.offset);
        effect.apply(&mut frame, 0.1);
        let second = effect.state.as_ref().map(|s| s.offset);
        assert_eq!(first, second);
    }

    #[test]
    fn offset_bounded_by_amplitude() {
        let mut effect = ShakeEffect {
            seed: Some(77),
            frequency: 1000.0,
            ..ShakeEffect::default()
        };
        let mut frame = Frame::new(2, 2);
        for _ in 0..200 {
            effect.apply(&mut frame, 0.01);
            let offset = effect.state.as_ref().map(|s| s.offset).unwrap();
            assert!(offset.x.abs() <= effect.amplitude);
            assert!(offset.y.abs() <= effect.amplitude);
        }
    }
}
