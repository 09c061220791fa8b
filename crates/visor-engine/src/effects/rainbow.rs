//! Rainbow post-effect: hue overlay on every lit pixel, with a
//! fade-in / running / fade-out lifecycle.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::color::hsv_to_rgb;
use crate::render::frame::Frame;

/// Explicit lifecycle of a fade-capable effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadeState {
    #[default]
    FadeIn,
    Running,
    FadeOut,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RainbowEffect {
    /// Cycle speed, cycles per second.
    pub speed: f32,
    /// Hue varies across the screen instead of being uniform.
    pub use_position: bool,
    pub fade_in_duration: f32,
    pub fade_out_duration: f32,
    #[serde(skip)]
    phase: f32,
    #[serde(skip)]
    state: FadeState,
    #[serde(skip)]
    fade_progress: f32,
    #[serde(skip)]
    stopping: bool,
}

impl Default for RainbowEffect {
    fn default() -> Self {
        Self {
            speed: 1.0,
            use_position: true,
            fade_in_duration: 1.0,
            fade_out_duration: 1.0,
            phase: 0.0,
            state: FadeState::FadeIn,
            fade_progress: 0.0,
            stopping: false,
        }
    }
}

/// Snapshot of the rainbow parameters the LED strip synchronizes with.
#[derive(Debug, Clone, Copy)]
pub struct RainbowSync {
    pub speed: f32,
    pub phase: f32,
}

impl RainbowEffect {
    /// Request a graceful stop: the effect fades out, then reports
    /// `Finished`.
    pub fn begin_fade_out(&mut self) {
        self.stopping = true;
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn fade_state(&self) -> FadeState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == FadeState::Finished
    }

    /// Phase/speed pair the LED strip derivation reads.
    pub fn sync(&self) -> RainbowSync {
        RainbowSync {
            speed: self.speed,
            phase: self.phase,
        }
    }

    pub fn apply(&mut self, frame: &mut Frame, dt: f32) {
        if self.speed <= 0.001 {
            return;
        }

        if self.stopping && self.state != FadeState::FadeOut && self.state != FadeState::Finished {
            self.state = FadeState::FadeOut;
        }

        match self.state {
            FadeState::FadeIn => {
                self.fade_progress += dt / self.fade_in_duration.max(0.001);
                if self.fade_progress >= 1.0 {
                    self.fade_progress = 1.0;
                    self.state = FadeState::Running;
                }
            }
            FadeState::Running => self.fade_progress = 1.0,
            FadeState::FadeOut => {
                self.fade_progress -= dt / self.fade_out_duration.max(0.001);
                if self.fade_progress <= 0.0 {
                    self.fade_progress = 0.0;
                    self.state = FadeState::Finished;
                    return;
                }
            }
            FadeState::Finished => return,
        }

        self.phase += dt * self.speed * TAU;
        if self.phase > TAU {
            self.phase -= TAU;
        }

        let width = frame.width();
        let height = frame.height();
        if width == 0 || height == 0 {
            return;
        }

        let phase_turn = (self.phase / TAU).rem_euclid(1.0);
        for y in 0..height {
            for x in 0..width {
                let px = frame.pixel(x, y);
                let brightness = px[0].max(px[1]).max(px[2]);
                if brightness == 0 {
                    continue;
                }

                let hue = if self.use_position {
                    let positional = (y as f32 / height.max(1) as f32
                        - x as f32 / width.max(1) as f32)
                        * 0.5;
                    (positional + phase_turn).rem_euclid(1.0)
                } else {
                    phase_turn
                };

                let value = f32::from(brightness) / 255.0;
                let rainbow = hsv_to_rgb(hue, 1.0, 1.0);
                let mut out = [0u8; 3];
                for c in 0..3 {
                    let tinted = f32::from(rainbow[c]) * value;
                    let blended = f32::from(px[c]) * (1.0 - self.fade_progress)
                        + tinted * self.fade_progress;
                    out[c] = blended.clamp(0.0, 255.0) as u8;
                }
                frame.set_pixel(x, y, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_pixels_stay_black() {
        let mut effect = RainbowEffect::default();
        let mut frame = Frame::new(4, 4);
        effect.apply(&mut frame, 0.5);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn fade_in_reaches_running() {
        let mut effect = RainbowEffect {
            fade_in_duration: 0.5,
            ..RainbowEffect::default()
        };
        let mut frame = Frame::new(2, 2);
        frame.fill([255, 255, 255]);
        effect.apply(&mut frame, 0.6);
        assert_eq!(effect.fade_state(), FadeState::Running);
    }

    #[test]
    fn fade_out_finishes_and_stops_touching_pixels() {
        let mut effect = RainbowEffect {
            fade_in_duration: 0.01,
            fade_out_duration: 0.2,
            ..RainbowEffect::default()
        };
        let mut frame = Frame::new(2, 2);
        frame.fill([200, 200, 200]);
        effect.apply(&mut frame, 0.05); // running
        effect.begin_fade_out();
        effect.apply(&mut frame, 1.0); // fades out completely
        assert!(effect.is_finished());

        let mut untouched = Frame::new(2, 2);
        untouched.fill([123, 45, 67]);
        let before = untouched.clone();
        effect.apply(&mut untouched, 0.05);
        assert_eq!(untouched, before);
    }

    #[test]
    fn full_fade_replaces_color_preserving_brightness() {
        let mut effect = RainbowEffect {
            fade_in_duration: 0.001,
            use_position: false,
            ..RainbowEffect::default()
        };
        let mut frame = Frame::new(1, 1);
        frame.fill([0, 0, 128]);
        effect.apply(&mut frame, 1.0);
        let px = frame.pixel(0, 0);
        // Value (max channel) is preserved within rounding.
        assert!((i16::from(px[0].max(px[1]).max(px[2])) - 128).abs() <= 1);
    }

    #[test]
    fn near_zero_speed_is_inert() {
        let mut effect = RainbowEffect {
            speed: 0.0005,
            ..RainbowEffect::default()
        };
        let mut frame = Frame::new(2, 2);
        frame.fill([10, 20, 30]);
        let before = frame.clone();
        effect.apply(&mut frame, 1.0);
        assert_eq!(frame, before);
        assert_eq!(effect.fade_state(), FadeState::FadeIn);
    }
}
