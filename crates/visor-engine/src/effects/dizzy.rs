//! Dizzy post-effect: sub-pixel sinusoidal resampling of the frame.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::render::frame::Frame;
use crate::render::subpixel::bilinear_sample;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DizzyEffect {
    /// Displacement amplitude in pixels (sub-pixel values work).
    pub amplitude: f32,
    /// Wave speed, cycles per second.
    pub speed: f32,
    /// Waves across the screen.
    pub wave_scale: f32,
    /// Vertical displacement relative to horizontal.
    pub vertical_ratio: f32,
    #[serde(skip)]
    phase: f32,
}

impl Default for DizzyEffect {
    fn default() -> Self {
        Self {
            amplitude: 0.8,
            speed: 0.5,
            wave_scale: 2.0,
            vertical_ratio: 0.7,
            phase: 0.0,
        }
    }
}

impl DizzyEffect {
    pub fn apply(&mut self, frame: &mut Frame, dt: f32) {
        if self.amplitude <= 0.001 {
            return;
        }

        self.phase += dt * self.speed * TAU;

        let width = frame.width();
        let height = frame.height();
        if width == 0 || height == 0 {
            return;
        }

        let source = frame.clone();
        let wx = self.wave_scale / width.max(1) as f32;
        let wy = self.wave_scale / height.max(1) as f32;

        for y in 0..height {
            let y_norm = y as f32 * wy;
            let offset_x = (y_norm * TAU + self.phase).sin() * self.amplitude;
            for x in 0..width {
                let x_norm = x as f32 * wx;
                let offset_y =
                    (x_norm * TAU + self.phase * 1.3).sin() * self.amplitude * self.vertical_ratio;

                let sample = bilinear_sample(&source, x as f32 - offset_x, y as f32 - offset_y);
                frame.set_pixel(
                    x,
                    y,
                    [
                        sample[0].clamp(0.0, 255.0) as u8,
                        sample[1].clamp(0.0, 255.0) as u8,
                        sample[2].clamp(0.0, 255.0) as u8,
                    ],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_amplitude_leaves_frame_untouched() {
        let mut frame = Frame::new(4, 4);
        frame.set_pixel(1, 1, [200, 10, 10]);
        let before = frame.clone();
        let mut effect = DizzyEffect {
            amplitude: 0.0,
            ..DizzyEffect::default()
        };
        effect.apply(&mut frame, 0.016);
        assert_eq!(frame, before);
    }

    #[test]
    fn uniform_frame_is_invariant() {
        // Resampling a constant image returns the same constant image.
        let mut frame = Frame::new(8, 8);
        frame.fill([40, 80, 120]);
        let mut effect = DizzyEffect::default();
        effect.apply(&mut frame, 0.1);
        for y in 0..8 {
            for x in 0..8 {
                let p = frame.pixel(x, y);
                assert!((i16::from(p[0]) - 40).abs() <= 1);
                assert!((i16::from(p[1]) - 80).abs() <= 1);
                assert!((i16::from(p[2]) - 120).abs() <= 1);
            }
        }
    }

    #[test]
    fn phase_advances_with_time() {
        let mut effect = DizzyEffect::default();
        let mut frame = Frame::new(2, 2);
        effect.apply(&mut frame, 0.5);
        let expected = 0.5 * effect.speed * TAU;
        assert!((effect.phase - expected).abs() < 1e-6);
    }
}
