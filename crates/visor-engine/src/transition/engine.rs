//! Frame-level transition engine: blends the outgoing frame into the
//! incoming one across a fixed number of frames.

use crate::render::frame::Frame;
use crate::transition::anim::{cosine_interpolation, AnimatedParameter, InterpolationMethod};
use crate::transition::similarity::{calculate_image_similarity, is_bright_to_dark, ImageView};

/// Similarity at or above which auto-detection morphs instead of jumping.
pub const FRAME_SIMILARITY_THRESHOLD: f32 = 0.08;

/// Progress at which a transition is considered done.
const COMPLETION_PROGRESS: f32 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionType {
    None,
    Crossfade,
    #[default]
    Morph,
    Jump,
}

/// One in-flight transition. Owns a snapshot of the frame it departs
/// from; the destination arrives fresh every tick.
#[derive(Debug)]
pub struct FrameTransition {
    pub from: Option<Frame>,
    pub transition_type: TransitionType,
    pub progress: AnimatedParameter,
    pub similarity: f32,
    pub force_crossfade: bool,
}

impl FrameTransition {
    pub fn is_complete(&self) -> bool {
        self.progress.value() >= COMPLETION_PROGRESS
    }
}

/// Holds at most one frame transition and applies it to each outgoing
/// frame until it completes.
pub struct TransitionEngine {
    active: Option<FrameTransition>,
    pub default_duration: u32,
    pub default_method: InterpolationMethod,
    pub auto_detect_type: bool,
}

impl TransitionEngine {
    pub fn new() -> Self {
        Self {
            active: None,
            default_duration: 15,
            default_method: InterpolationMethod::Cosine,
            auto_detect_type: true,
        }
    }

    /// Begin a transition from `from` (None for a plain fade-in) toward
    /// `to`. With auto-detection on, similar frames morph, dissimilar
    /// frames jump, and bright→dark always crossfades.
    pub fn start_transition(
        &mut self,
        from: Option<Frame>,
        to: &Frame,
        transition_type: TransitionType,
        duration_frames: Option<u32>,
        method: Option<InterpolationMethod>,
    ) {
        let mut progress = AnimatedParameter::new(
            duration_frames.unwrap_or(self.default_duration),
            method.unwrap_or(self.default_method),
        );
        progress.set_target(1.0);

        let (similarity, force_crossfade) = match &from {
            Some(f) => (
                calculate_image_similarity(ImageView::of_frame(f), ImageView::of_frame(to)),
                is_bright_to_dark(ImageView::of_frame(f), ImageView::of_frame(to)),
            ),
            None => (0.0, false),
        };

        let mut transition = FrameTransition {
            from,
            transition_type,
            progress,
            similarity,
            force_crossfade,
        };

        if self.auto_detect_type && transition.from.is_some() {
            transition.transition_type = if similarity >= FRAME_SIMILARITY_THRESHOLD {
                TransitionType::Morph
            } else {
                TransitionType::Jump
            };
        }

        self.active = Some(transition);
    }

    /// Advance the active transition and blend it into `current`.
    /// Returns `current` unchanged when idle; once progress completes
    /// the transition is dropped and `current` passes through verbatim.
    pub fn process(&mut self, current: Frame, dt: f32) -> Frame {
        let Some(transition) = self.active.as_mut() else {
            return current;
        };

        transition.progress.update(dt);
        if transition.is_complete() {
            self.active = None;
            return current;
        }

        let t = transition.progress.value();
        let Some(from) = transition.from.as_ref() else {
            return fade_in(&current, t);
        };

        if transition.force_crossfade {
            return crossfade(from, &current, t);
        }

        match transition.transition_type {
            TransitionType::Crossfade | TransitionType::Morph => crossfade(from, &current, t),
            TransitionType::Jump => jump(from, &current, t),
            TransitionType::None => current,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&FrameTransition> {
        self.active.as_ref()
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }
}

impl Default for TransitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn fade_in(frame: &Frame, t: f32) -> Frame {
    let mut out = Frame::new(frame.width(), frame.height());
    for (dst, src) in out.as_bytes_mut().iter_mut().zip(frame.as_bytes()) {
        *dst = (f32::from(*src) * t) as u8;
    }
    out
}

fn crossfade(from: &Frame, to: &Frame, t: f32) -> Frame {
    let smooth_t = cosine_interpolation(0.0, 1.0, t);
    let mut out = Frame::new(to.width(), to.height());
    for ((dst, a), b) in out
        .as_bytes_mut()
        .iter_mut()
        .zip(from.as_bytes())
        .zip(to.as_bytes())
    {
        let fa = f32::from(*a);
        *dst = (fa + (f32::from(*b) - fa) * smooth_t) as u8;
    }
    out
}

/// Bottom-up reveal: the old frame fades with `1 − t²` while the new
/// frame's rows slide in from the bottom; black new-frame pixels are
/// treated as transparent.
fn jump(from: &Frame, to: &Frame, t: f32) -> Frame {
    let width = to.width();
    let height = to.height();
    let mut out = Frame::new(width, height);

    let fade_out = 1.0 - t * t;
    for (dst, src) in out.as_bytes_mut().iter_mut().zip(from.as_bytes()) {
        *dst = (f32::from(*src) * fade_out) as u8;
    }

    let current_y = ((1.0 - t) * height as f32) as usize;
    if current_y < height {
        let visible_h = height - current_y;
        for sy in 0..visible_h {
            for x in 0..width {
                let px = to.pixel(x, sy);
                if px[0] > 0 || px[1] > 0 || px[2] > 0 {
                    out.set_pixel(x, current_y + sy, px);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(w: usize, h: usize, rgb: [u8; 3]) -> Frame {
        let mut f = Frame::new(w, h);
        f.fill(rgb);
        f
    }

    #[test]
    fn idle_engine_passes_frames_through() {
        let mut engine = TransitionEngine::new();
        let frame = filled(4, 4, [10, 20, 30]);
        let out = engine.process(frame.clone(), 0.016);
        assert_eq!(out, frame);
    }

    #[test]
    fn bright_to_dark_forces_crossfade() {
        let mut engine = TransitionEngine::new();
        let white = filled(4, 4, [255, 255, 255]);
        let black = Frame::new(4, 4);
        engine.start_transition(Some(white), &black, TransitionType::Jump, None, None);
        assert!(engine.active().unwrap().force_crossfade);
    }

    #[test]
    fn auto_detect_picks_jump_for_dissimilar_frames() {
        let mut engine = TransitionEngine::new();
        let mut a = Frame::new(8, 8);
        a.set_pixel(0, 0, [255, 255, 255]);
        let mut b = Frame::new(8, 8);
        for y in 0..8 {
            for x in 4..8 {
                b.set_pixel(x, y, [200, 200, 200]);
            }
        }
        engine.start_transition(Some(a), &b, TransitionType::Morph, None, None);
        assert_eq!(
            engine.active().unwrap().transition_type,
            TransitionType::Jump
        );
    }

    #[test]
    fn auto_detect_picks_morph_for_similar_frames() {
        let mut engine = TransitionEngine::new();
        let a = filled(8, 8, [200, 200, 200]);
        let b = filled(8, 8, [190, 190, 190]);
        engine.start_transition(Some(a), &b, TransitionType::Jump, None, None);
        assert_eq!(
            engine.active().unwrap().transition_type,
            TransitionType::Morph
        );
    }

    #[test]
    fn morph_midpoint_is_half_blend() {
        let mut engine = TransitionEngine::new();
        engine.auto_detect_type = false;
        let white = filled(4, 4, [255, 255, 255]);
        let black = Frame::new(4, 4);
        // Frame-counted linear ramp + cosine easing: drive to the exact
        // midpoint (ramp 0.5 → cosine 0.5).
        engine.start_transition(Some(white), &black, TransitionType::Morph, Some(10), None);
        let mut out = black.clone();
        for _ in 0..5 {
            out = engine.process(black.clone(), 1.0 / 60.0);
        }
        for &b in out.as_bytes() {
            assert!((i16::from(b) - 128).abs() <= 1, "byte was {}", b);
        }
    }

    #[test]
    fn transition_completes_and_detaches() {
        let mut engine = TransitionEngine::new();
        engine.auto_detect_type = false;
        let a = filled(2, 2, [50, 50, 50]);
        let b = filled(2, 2, [60, 60, 60]);
        engine.start_transition(Some(a), &b, TransitionType::Crossfade, Some(5), None);
        for _ in 0..10 {
            engine.process(b.clone(), 1.0 / 60.0);
        }
        assert!(!engine.is_transitioning());
        let out = engine.process(b.clone(), 1.0 / 60.0);
        assert_eq!(out, b);
    }

    #[test]
    fn jump_reveals_bottom_rows() {
        let from = filled(4, 4, [10, 10, 10]);
        let mut to = Frame::new(4, 4);
        // Checker: alternate black and red.
        for y in 0..4 {
            for x in 0..4 {
                if (x + y) % 2 == 0 {
                    to.set_pixel(x, y, [200, 0, 0]);
                }
            }
        }
        let out = jump(&from, &to, 0.5);
        // fade_out = 0.75 → old contribution (7,7,7).
        assert_eq!(out.pixel(1, 0), [7, 7, 7]);
        // Lower half overlays to's top rows where non-black.
        assert_eq!(out.pixel(0, 2), [200, 0, 0]);
        // Black checker cells keep the faded background.
        assert_eq!(out.pixel(1, 2), [7, 7, 7]);
    }

    #[test]
    fn fade_in_scales_pixels() {
        let frame = filled(2, 2, [100, 100, 100]);
        let out = fade_in(&frame, 0.5);
        assert_eq!(out.pixel(0, 0), [50, 50, 50]);
    }
}
