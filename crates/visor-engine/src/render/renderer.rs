//! Rasterizes frame descriptions: pre-effects, layers in painter's
//! order, then post-effects in their fixed sequence.

use std::collections::HashMap;

use log::warn;

use crate::effects::EffectKind;
use crate::render::description::FrameDescription;
use crate::render::frame::Frame;
use crate::render::layer::{AnimatedSpriteLayer, Layer, LayerId, RectLayer};
use crate::render::subpixel::draw_subpixel_sprite;
use crate::render::text::FontStore;

/// Ticks an animation entry may go unseen before eviction.
const STALE_ANIM_TICKS: u64 = 600;

/// Post-effects always run in this order, regardless of their position
/// in the description: Dizzy, Rainbow, Shake, ColorOverride.
fn post_rank(kind: &EffectKind) -> Option<u8> {
    match kind {
        EffectKind::Wiggle(_) => None,
        EffectKind::Dizzy(_) => Some(0),
        EffectKind::Rainbow(_) => Some(1),
        EffectKind::Shake(_) => Some(2),
        EffectKind::ColorOverride(_) => Some(3),
    }
}

#[derive(Debug, Clone)]
struct AnimState {
    current: usize,
    elapsed: f32,
    completed: bool,
    last_seen_tick: u64,
}

/// The rasterizer. Holds the font store and the authoritative
/// animation counters, keyed by layer identity so they survive per-tick
/// description rebuilds.
pub struct Renderer {
    fonts: FontStore,
    anim: HashMap<LayerId, AnimState>,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            fonts: FontStore::new(),
            anim: HashMap::new(),
        }
    }

    /// Render a description into a fresh frame. `tick` is the loop's
    /// frame counter; pre-effects use it to stay idempotent when the
    /// same description set is rendered more than once per tick.
    pub fn render_frame(&mut self, desc: &mut FrameDescription, dt: f32, tick: u64) -> Frame {
        let mut frame = Frame::new(desc.width, desc.height);

        let FrameDescription { layers, effects, .. } = desc;
        for effect in effects.iter_mut() {
            effect.apply_pre(layers, dt, tick);
        }

        for layer in layers.iter_mut() {
            match layer {
                Layer::Fill(fill) => frame.fill(fill.color.channels()),
                Layer::Rect(rect) => draw_rect(&mut frame, rect),
                Layer::Sprite(sprite) => draw_subpixel_sprite(
                    &mut frame,
                    sprite.pixels.data(),
                    sprite.pixels.width(),
                    sprite.pixels.height(),
                    sprite.x,
                    sprite.y,
                ),
                Layer::AnimatedSprite(sprite) => {
                    self.advance_animation(sprite, dt, tick);
                    if let Some(pixels) = sprite.frames.get(sprite.current_frame) {
                        draw_subpixel_sprite(
                            &mut frame,
                            pixels.data(),
                            pixels.width(),
                            pixels.height(),
                            sprite.x,
                            sprite.y,
                        );
                    }
                }
                Layer::Text(text) => {
                    match self.fonts.rasterize(
                        &text.text,
                        text.font_size,
                        text.color,
                        text.font_path.as_deref(),
                    ) {
                        Ok(Some(pixels)) => draw_subpixel_sprite(
                            &mut frame,
                            pixels.data(),
                            pixels.width(),
                            pixels.height(),
                            text.x,
                            text.y,
                        ),
                        Ok(None) => {}
                        Err(e) => warn!("text layer skipped: {e}"),
                    }
                }
            }
        }

        for rank in 0..=3 {
            for effect in effects.iter_mut() {
                if post_rank(&effect.kind) == Some(rank) {
                    effect.apply_post(&mut frame, dt);
                }
            }
        }

        self.evict_stale_animations(tick);
        frame
    }

    fn advance_animation(&mut self, layer: &mut AnimatedSpriteLayer, dt: f32, tick: u64) {
        if layer.frames.is_empty() {
            return;
        }
        let last = layer.frames.len() - 1;
        let state = self.anim.entry(layer.id).or_insert_with(|| AnimState {
            current: layer.current_frame.min(last),
            elapsed: layer.elapsed,
            completed: false,
            last_seen_tick: tick,
        });
        state.last_seen_tick = tick;

        state.elapsed += dt;
        loop {
            let duration = layer.durations[state.current];
            if duration <= 0.0 || state.elapsed < duration {
                break;
            }
            state.elapsed -= duration;
            if state.current < last {
                state.current += 1;
                continue;
            }
            // End of the sequence: wrap or clamp, firing the one-shot
            // completion hook the first time either way.
            if !state.completed {
                state.completed = true;
                if let Some(hook) = layer.on_complete.take() {
                    hook.fire();
                }
            }
            if layer.looping {
                state.current = 0;
            } else {
                state.current = last;
                break;
            }
        }

        layer.current_frame = state.current;
        layer.elapsed = state.elapsed;
    }

    fn evict_stale_animations(&mut self, tick: u64) {
        self.anim
            .retain(|_, s| tick.saturating_sub(s.last_seen_tick) <= STALE_ANIM_TICKS);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn draw_rect(frame: &mut Frame, rect: &RectLayer) {
    let x_start = (rect.x as i64).clamp(0, frame.width() as i64) as usize;
    let y_start = (rect.y as i64).clamp(0, frame.height() as i64) as usize;
    let x_end = ((rect.x + rect.width) as i64).clamp(0, frame.width() as i64) as usize;
    let y_end = ((rect.y + rect.height) as i64).clamp(0, frame.height() as i64) as usize;
    if x_start >= x_end || y_start >= y_end {
        return;
    }

    let alpha = rect.color.alpha_f32();
    let src = rect.color.channels();
    for y in y_start..y_end {
        for x in x_start..x_end {
            let dst = frame.pixel(x, y);
            let mut out = [0u8; 3];
            for c in 0..3 {
                out[c] =
                    (f32::from(src[c]) * alpha + f32::from(dst[c]) * (1.0 - alpha)) as u8;
            }
            frame.set_pixel(x, y, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::render::layer::SpritePixels;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn fill_then_rect_composes() {
        let mut renderer = Renderer::new();
        let mut desc = FrameDescription::with_size(4, 4);
        desc.push_layer(Layer::fill(Rgba::new(0, 0, 0, 255)));
        desc.push_layer(Layer::rect(1.0, 1.0, 2.0, 2.0, Rgba::new(255, 0, 0, 128)));
        let frame = renderer.render_frame(&mut desc, 0.016, 0);

        for y in 0..4 {
            for x in 0..4 {
                let p = frame.pixel(x, y);
                if (1..3).contains(&x) && (1..3).contains(&y) {
                    assert!((i16::from(p[0]) - 128).abs() <= 1, "interior {:?}", p);
                    assert_eq!(p[1], 0);
                } else {
                    assert_eq!(p, [0, 0, 0], "border at {},{}", x, y);
                }
            }
        }
    }

    #[test]
    fn no_effects_render_is_deterministic() {
        let layer = Layer::sprite(SpritePixels::solid(2, 2, Rgba::rgb(10, 200, 30)), 1.0, 1.0);
        let mut a = FrameDescription::with_size(8, 8);
        a.push_layer(layer.clone());
        let mut b = FrameDescription::with_size(8, 8);
        b.push_layer(layer);

        let mut renderer = Renderer::new();
        let fa = renderer.render_frame(&mut a, 0.016, 0);
        let fb = renderer.render_frame(&mut b, 0.016, 1);
        assert_eq!(fa, fb);
    }

    #[test]
    fn rect_clips_to_frame() {
        let mut renderer = Renderer::new();
        let mut desc = FrameDescription::with_size(2, 2);
        desc.push_layer(Layer::rect(-5.0, -5.0, 20.0, 20.0, Rgba::rgb(9, 9, 9)));
        let frame = renderer.render_frame(&mut desc, 0.016, 0);
        assert_eq!(frame.pixel(0, 0), [9, 9, 9]);
        assert_eq!(frame.pixel(1, 1), [9, 9, 9]);
    }

    fn two_frame_sprite() -> AnimatedSpriteLayer {
        AnimatedSpriteLayer::new(
            vec![
                SpritePixels::solid(1, 1, Rgba::rgb(255, 0, 0)),
                SpritePixels::solid(1, 1, Rgba::rgb(0, 255, 0)),
            ],
            vec![0.1, 0.1],
            false,
        )
    }

    #[test]
    fn animation_advances_across_renders() {
        let mut renderer = Renderer::new();
        let layer = two_frame_sprite();

        // The app clones its stored layer into a fresh description each
        // tick; identity keeps the counters moving.
        let mut desc = FrameDescription::with_size(2, 2);
        desc.push_layer(Layer::AnimatedSprite(layer.clone()));
        let f0 = renderer.render_frame(&mut desc, 0.05, 0);
        assert_eq!(f0.pixel(0, 0), [255, 0, 0]);

        let mut desc = FrameDescription::with_size(2, 2);
        desc.push_layer(Layer::AnimatedSprite(layer.clone()));
        let f1 = renderer.render_frame(&mut desc, 0.07, 1);
        assert_eq!(f1.pixel(0, 0), [0, 255, 0]);
    }

    #[test]
    fn non_looping_clamps_to_last_frame() {
        let mut renderer = Renderer::new();
        let layer = two_frame_sprite();
        let mut desc = FrameDescription::with_size(2, 2);
        desc.push_layer(Layer::AnimatedSprite(layer));
        let frame = renderer.render_frame(&mut desc, 10.0, 0);
        assert_eq!(frame.pixel(0, 0), [0, 255, 0]);
    }

    #[test]
    fn completion_hook_fires_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let hook_counter = Arc::clone(&counter);
        let mut layer = two_frame_sprite();
        layer.on_complete = Some(crate::render::layer::CompletionHook::new(move || {
            hook_counter.fetch_add(1, Ordering::SeqCst);
        }));

        let mut renderer = Renderer::new();
        for tick in 0..5 {
            let mut desc = FrameDescription::with_size(2, 2);
            desc.push_layer(Layer::AnimatedSprite(layer.clone()));
            renderer.render_frame(&mut desc, 0.25, tick);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_font_skips_text_layer() {
        let mut renderer = Renderer::new();
        let mut desc = FrameDescription::with_size(8, 8);
        let mut text = crate::render::layer::TextLayer::new("hi", 0.0, 0.0, 8.0, Rgba::WHITE);
        text.font_path = Some("/nonexistent/font.ttf".into());
        desc.push_layer(Layer::Text(text));
        let frame = renderer.render_frame(&mut desc, 0.016, 0);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }
}
