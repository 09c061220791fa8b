//! Part-level transitions: blends the sprite of one logical face part
//! between two states, independently per part.
//!
//! Similar parts morph (center-of-mass warp with bilinear splatting),
//! dissimilar parts crossfade, and whole-part swaps can jump in from
//! the bottom. Coordinates interpolate with cosine easing in all modes.

use std::collections::HashMap;

use crate::render::layer::{Layer, SpriteLayer, SpritePixels};
use crate::transition::anim::{AnimatedParameter, InterpolationMethod};
use crate::transition::similarity::{calculate_image_similarity, is_bright_to_dark, ImageView};

/// Similarity at or above which a part morphs instead of crossfading.
pub const PART_SIMILARITY_THRESHOLD: f32 = 0.1;

/// Above this similarity (with equal shapes and coordinates) blending
/// is skipped entirely.
const SKIP_SIMILARITY: f32 = 0.985;

/// Alpha (normalized) above which a source pixel participates in the
/// morph warp.
const MORPH_ALPHA_CUTOFF: f32 = 0.05;

const COMPLETION_PROGRESS: f32 = 0.99;

/// Captured pixels and position of one part state.
#[derive(Debug, Clone)]
struct PartSnapshot {
    pixels: Option<SpritePixels>,
    x: f32,
    y: f32,
}

impl PartSnapshot {
    fn capture(layer: &Layer) -> Self {
        let (x, y) = layer.position().unwrap_or((0.0, 0.0));
        let pixels = match layer {
            Layer::Sprite(s) => Some(s.pixels.clone()),
            Layer::AnimatedSprite(s) => s.frames.get(s.current_frame).cloned(),
            _ => None,
        };
        Self { pixels, x, y }
    }
}

/// One in-flight part transition.
#[derive(Debug)]
pub struct PartTransition {
    from: Option<PartSnapshot>,
    to: PartSnapshot,
    to_layer: Layer,
    pub progress: AnimatedParameter,
    pub similarity: f32,
    pub force_crossfade: bool,
    pub use_jump: bool,
}

impl PartTransition {
    pub fn is_complete(&self) -> bool {
        self.progress.value() >= COMPLETION_PROGRESS
    }

    /// Morph when the shapes read as the same thing; otherwise crossfade.
    pub fn use_morph(&self) -> bool {
        self.similarity >= PART_SIMILARITY_THRESHOLD && !self.force_crossfade
    }
}

/// Keeps the active transition per part name and blends layers on
/// request.
pub struct PartTransitionManager {
    active: HashMap<String, PartTransition>,
    pub crossfade_duration: u32,
    pub morph_duration: u32,
    pub jump_duration: u32,
    pub method: InterpolationMethod,
}

impl PartTransitionManager {
    pub fn new() -> Self {
        Self {
            active: HashMap::new(),
            crossfade_duration: 40,
            morph_duration: 140,
            jump_duration: 60,
            method: InterpolationMethod::Cosine,
        }
    }

    /// Begin a transition for `part` from an optional previous layer
    /// state to the new one. Duration defaults by blend mode.
    pub fn start_transition(
        &mut self,
        part: &str,
        from: Option<&Layer>,
        to: &Layer,
        duration_frames: Option<u32>,
        method: Option<InterpolationMethod>,
        use_jump: bool,
    ) {
        let from_snapshot = from.map(PartSnapshot::capture);
        let to_snapshot = PartSnapshot::capture(to);

        let (similarity, force_crossfade) = match (&from_snapshot, &to_snapshot) {
            (Some(f), t) => match (&f.pixels, &t.pixels) {
                (Some(fp), Some(tp)) => {
                    let fv = ImageView::rgba(fp.data(), fp.width(), fp.height());
                    let tv = ImageView::rgba(tp.data(), tp.width(), tp.height());
                    let sim = if fp.width() == tp.width() && fp.height() == tp.height() {
                        calculate_image_similarity(fv, tv)
                    } else {
                        0.0
                    };
                    (sim, is_bright_to_dark(fv, tv))
                }
                _ => (0.0, false),
            },
            _ => (0.0, false),
        };

        let mut transition = PartTransition {
            from: from_snapshot,
            to: to_snapshot,
            to_layer: to.clone(),
            progress: AnimatedParameter::new(0, self.method),
            similarity,
            force_crossfade,
            use_jump,
        };

        let frames = duration_frames.unwrap_or(if use_jump {
            self.jump_duration
        } else if transition.use_morph() {
            self.morph_duration
        } else {
            self.crossfade_duration
        });
        let mut progress = AnimatedParameter::new(frames, method.unwrap_or(self.method));
        progress.set_target(1.0);
        transition.progress = progress;

        log::debug!(
            "part transition {part}: similarity={:.3} morph={}",
            transition.similarity,
            transition.use_morph()
        );
        self.active.insert(part.to_string(), transition);
    }

    /// Advance all transitions and drop the completed ones.
    pub fn update(&mut self, dt: f32) {
        for transition in self.active.values_mut() {
            transition.progress.update(dt);
        }
        self.active.retain(|_, t| !t.is_complete());
    }

    pub fn get(&self, part: &str) -> Option<&PartTransition> {
        self.active.get(part)
    }

    pub fn has_transition(&self, part: &str) -> bool {
        self.active.contains_key(part)
    }

    pub fn cancel(&mut self, part: &str) {
        self.active.remove(part);
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Produce the blended layer for one transition. When nothing
    /// visibly changes between the states, the destination layer is
    /// returned untouched.
    pub fn blend_layer(&self, transition: &PartTransition) -> Layer {
        let t = transition.progress.value();

        let Some(from) = transition.from.as_ref() else {
            return apply_fade_in(&transition.to_layer, t);
        };

        if let (Some(fp), Some(tp)) = (&from.pixels, &transition.to.pixels) {
            let same_shape = fp.width() == tp.width() && fp.height() == tp.height();
            let same_pos = (from.x - transition.to.x).abs() < 1e-5
                && (from.y - transition.to.y).abs() < 1e-5;
            if same_shape && same_pos && transition.similarity > SKIP_SIMILARITY {
                return transition.to_layer.clone();
            }
        }

        let (Some(fp), Some(tp)) = (&from.pixels, &transition.to.pixels) else {
            return transition.to_layer.clone();
        };

        let cos_t = (1.0 - (t * std::f32::consts::PI).cos()) / 2.0;
        let x = from.x + (transition.to.x - from.x) * cos_t;
        let y = from.y + (transition.to.y - from.y) * cos_t;

        let blended = if transition.use_jump {
            blend_jump(fp, tp, t, cos_t)
        } else if transition.use_morph() {
            blend_morph(fp, tp, cos_t)
        } else {
            blend_crossfade(fp, tp, cos_t)
        };

        rebuild_sprite(&transition.to_layer, blended, x, y)
    }
}

impl Default for PartTransitionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap blended pixels into a sprite layer, keeping the destination
/// layer's identity so per-layer effect state stays stable.
fn rebuild_sprite(to_layer: &Layer, pixels: SpritePixels, x: f32, y: f32) -> Layer {
    let mut sprite = SpriteLayer::new(pixels, x, y);
    if let Some(id) = to_layer.id() {
        sprite.id = id;
    }
    Layer::Sprite(sprite)
}

/// Fade a sprite in by scaling its alpha channel.
fn apply_fade_in(layer: &Layer, t: f32) -> Layer {
    let Layer::Sprite(sprite) = layer else {
        return layer.clone();
    };
    let src = sprite.pixels.data();
    let mut data = src.to_vec();
    for px in data.chunks_exact_mut(4) {
        px[3] = (f32::from(px[3]) * t) as u8;
    }
    let mut out = SpriteLayer::new(
        SpritePixels::new(sprite.pixels.width(), sprite.pixels.height(), data),
        sprite.x,
        sprite.y,
    );
    out.id = sprite.id;
    Layer::Sprite(out)
}

/// Center-of-mass morph: warp source pixels toward their scaled target
/// positions, splat bilinearly, and combine with the destination using
/// premultiplied weights `(1 − cos_t)` / `cos_t`.
fn blend_morph(from: &SpritePixels, to: &SpritePixels, cos_t: f32) -> SpritePixels {
    let w = from.width();
    let h = from.height();
    let src = from.data();
    let dst = to.data();

    // When the shapes disagree the pair was classified dissimilar and
    // never reaches the morph path; fall back defensively anyway.
    if to.width() != w || to.height() != h {
        return to.clone();
    }

    let alpha_at = |data: &[u8], x: usize, y: usize| -> f32 {
        f32::from(data[(y * w + x) * 4 + 3]) / 255.0
    };

    let (center_src, w_src, h_src) = mask_center_and_size(src, w, h);
    let (center_dst, w_dst, h_dst) = mask_center_and_size(dst, w, h);

    let scale_x = (w_dst / w_src.max(1.0)).clamp(0.4, 2.5);
    let scale_y = (h_dst / h_src.max(1.0)).clamp(0.4, 2.5);

    let mut moved_rgb = vec![[0.0f32; 3]; w * h];
    let mut alpha_acc = vec![0.0f32; w * h];

    for sy in 0..h {
        for sx in 0..w {
            let alpha = alpha_at(src, sx, sy);
            if alpha <= MORPH_ALPHA_CUTOFF {
                continue;
            }
            let i = (sy * w + sx) * 4;
            let rgb = [
                f32::from(src[i]),
                f32::from(src[i + 1]),
                f32::from(src[i + 2]),
            ];

            let tx = center_dst[0] + (sx as f32 - center_src[0]) * scale_x;
            let ty = center_dst[1] + (sy as f32 - center_src[1]) * scale_y;
            let cur_x = sx as f32 + (tx - sx as f32) * cos_t;
            let cur_y = sy as f32 + (ty - sy as f32) * cos_t;

            let x0 = cur_x.floor() as i64;
            let y0 = cur_y.floor() as i64;
            let wx = cur_x - x0 as f32;
            let wy = cur_y - y0 as f32;

            for (weight, px, py) in [
                ((1.0 - wx) * (1.0 - wy), x0, y0),
                ((1.0 - wx) * wy, x0, y0 + 1),
                (wx * (1.0 - wy), x0 + 1, y0),
                (wx * wy, x0 + 1, y0 + 1),
            ] {
                if px < 0 || px >= w as i64 || py < 0 || py >= h as i64 {
                    continue;
                }
                let cell = (py as usize) * w + px as usize;
                let contrib = alpha * weight;
                alpha_acc[cell] += contrib;
                for c in 0..3 {
                    moved_rgb[cell][c] += rgb[c] * contrib;
                }
            }
        }
    }

    let mut out = vec![0u8; w * h * 4];
    for cell in 0..w * h {
        let warped_alpha = alpha_acc[cell].clamp(0.0, 1.0);
        let dst_alpha = alpha_at(dst, cell % w, cell / w);

        let src_mix = warped_alpha * (1.0 - cos_t);
        let dst_mix = dst_alpha * cos_t;
        let total = src_mix + dst_mix - src_mix * dst_mix;

        let i = cell * 4;
        if total < 1e-5 {
            out[i + 3] = 0;
            continue;
        }
        for c in 0..3 {
            let premult = f32::from(dst[i + c]) * dst_mix + moved_rgb[cell][c] * (1.0 - cos_t);
            out[i + c] = (premult / total).clamp(0.0, 255.0) as u8;
        }
        out[i + 3] = (total * 255.0).clamp(0.0, 255.0) as u8;
    }

    SpritePixels::new(w, h, out)
}

/// Alpha-weighted center of mass plus mask extents of an RGBA buffer.
fn mask_center_and_size(data: &[u8], w: usize, h: usize) -> ([f32; 2], f32, f32) {
    let mut weight_sum = 0.0f64;
    let mut cx = 0.0f64;
    let mut cy = 0.0f64;
    let mut min_x = usize::MAX;
    let mut max_x = 0usize;
    let mut min_y = usize::MAX;
    let mut max_y = 0usize;

    for y in 0..h {
        for x in 0..w {
            let alpha = f32::from(data[(y * w + x) * 4 + 3]) / 255.0;
            if alpha <= MORPH_ALPHA_CUTOFF {
                continue;
            }
            weight_sum += f64::from(alpha);
            cx += f64::from(alpha) * x as f64;
            cy += f64::from(alpha) * y as f64;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if weight_sum < 1e-5 {
        return ([w as f32 * 0.5, h as f32 * 0.5], 1.0, 1.0);
    }
    (
        [(cx / weight_sum) as f32, (cy / weight_sum) as f32],
        (max_x - min_x + 1) as f32,
        (max_y - min_y + 1) as f32,
    )
}

/// Plain RGBA crossfade. Mismatched shapes blend on the destination
/// canvas with the source centered.
fn blend_crossfade(from: &SpritePixels, to: &SpritePixels, cos_t: f32) -> SpritePixels {
    let from_alpha = 1.0 - cos_t;
    let to_alpha = cos_t;

    if from.width() == to.width() && from.height() == to.height() {
        let mut data = vec![0u8; to.data().len()];
        for ((dst, &a), &b) in data.iter_mut().zip(from.data()).zip(to.data()) {
            *dst = (f32::from(a) * from_alpha + f32::from(b) * to_alpha) as u8;
        }
        return SpritePixels::new(to.width(), to.height(), data);
    }

    let w_to = to.width();
    let h_to = to.height();
    let mut data: Vec<u8> = to
        .data()
        .iter()
        .map(|&b| (f32::from(b) * to_alpha) as u8)
        .collect();

    let w_from = from.width();
    let h_from = from.height();
    if h_from <= h_to && w_from <= w_to {
        let y_off = (h_to - h_from) / 2;
        let x_off = (w_to - w_from) / 2;
        for sy in 0..h_from {
            for sx in 0..w_from {
                let si = (sy * w_from + sx) * 4;
                let di = ((sy + y_off) * w_to + sx + x_off) * 4;
                for c in 0..4 {
                    let add = (f32::from(from.data()[si + c]) * from_alpha) as u8;
                    data[di + c] = data[di + c].saturating_add(add);
                }
            }
        }
    }
    SpritePixels::new(w_to, h_to, data)
}

/// Bottom-up reveal on the part's own canvas: the old pixels fade with
/// `1 − cos_t` while the new image slides up; black or transparent new
/// pixels keep the faded old image.
fn blend_jump(from: &SpritePixels, to: &SpritePixels, t: f32, cos_t: f32) -> SpritePixels {
    let width = to.width();
    let height = to.height();
    let fade_out = 1.0 - cos_t;

    let mut data = vec![0u8; width * height * 4];
    if from.width() == width && from.height() == height {
        for (dst, &src) in data.iter_mut().zip(from.data()) {
            *dst = (f32::from(src) * fade_out) as u8;
        }
    } else if from.height() <= height && from.width() <= width {
        let y_off = (height - from.height()) / 2;
        let x_off = (width - from.width()) / 2;
        for sy in 0..from.height() {
            for sx in 0..from.width() {
                let si = (sy * from.width() + sx) * 4;
                let di = ((sy + y_off) * width + sx + x_off) * 4;
                for c in 0..4 {
                    data[di + c] = (f32::from(from.data()[si + c]) * fade_out) as u8;
                }
            }
        }
    }

    let cos_movement = (1.0 - ((1.0 - t) * std::f32::consts::PI).cos()) / 2.0;
    let current_y = (cos_movement * height as f32) as usize;
    if current_y < height {
        let visible_h = height - current_y;
        for sy in 0..visible_h {
            for x in 0..width {
                let si = (sy * width + x) * 4;
                let px = &to.data()[si..si + 4];
                let lit = px[3] > 0 && (px[0] > 0 || px[1] > 0 || px[2] > 0);
                if lit {
                    let di = ((current_y + sy) * width + x) * 4;
                    data[di..di + 4].copy_from_slice(px);
                }
            }
        }
    }

    SpritePixels::new(width, height, data)
}
