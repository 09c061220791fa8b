//! Layer variants composing a frame description.
//!
//! Layers are a tagged union rendered in list order (painter's algorithm).
//! Sprite pixel data is shared via `Arc` so descriptions can be rebuilt
//! every tick without copying bitmaps.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::color::Rgba;

/// Stable identity for a layer. Survives clones, so per-layer state held
/// by the renderer or by pre-effects can be keyed on it across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub u32);

static NEXT_LAYER_ID: AtomicU32 = AtomicU32::new(1);

impl LayerId {
    /// Allocate a fresh id from the global counter.
    pub fn next() -> Self {
        LayerId(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Immutable RGBA bitmap shared between layers and transition snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpritePixels {
    width: usize,
    height: usize,
    data: Arc<[u8]>,
}

impl SpritePixels {
    /// Wrap an RGBA buffer. Length must be exactly `width * height * 4`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), width * height * 4, "sprite buffer size mismatch");
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    /// A `width`×`height` sprite filled with one color.
    pub fn solid(width: usize, height: usize, color: Rgba) -> Self {
        let mut data = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            data.extend_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        Self::new(width, height, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// One-shot callback fired when a non-looping animation finishes its
/// first pass (or a looping one wraps for the first time).
#[derive(Clone)]
pub struct CompletionHook(Arc<dyn Fn() + Send + Sync>);

impl CompletionHook {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn fire(&self) {
        (self.0)();
    }
}

impl fmt::Debug for CompletionHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompletionHook")
    }
}

/// Fills the entire frame with a color (alpha ignored).
#[derive(Debug, Clone)]
pub struct FillLayer {
    pub color: Rgba,
}

/// Axis-aligned alpha-blended rectangle.
#[derive(Debug, Clone)]
pub struct RectLayer {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Rgba,
}

/// Sub-pixel positioned RGBA bitmap.
#[derive(Debug, Clone)]
pub struct SpriteLayer {
    pub id: LayerId,
    pub pixels: SpritePixels,
    pub x: f32,
    pub y: f32,
}

impl SpriteLayer {
    pub fn new(pixels: SpritePixels, x: f32, y: f32) -> Self {
        Self {
            id: LayerId::next(),
            pixels,
            x,
            y,
        }
    }
}

/// Frame-sequence sprite. `frames` and `durations` must be the same
/// length. `current_frame`/`elapsed` seed the renderer's animation state
/// the first time the layer is seen; the renderer writes the advanced
/// values back each tick.
#[derive(Debug, Clone)]
pub struct AnimatedSpriteLayer {
    pub id: LayerId,
    pub frames: Vec<SpritePixels>,
    pub durations: Vec<f32>,
    pub current_frame: usize,
    pub elapsed: f32,
    pub looping: bool,
    pub on_complete: Option<CompletionHook>,
    pub x: f32,
    pub y: f32,
}

impl AnimatedSpriteLayer {
    pub fn new(frames: Vec<SpritePixels>, durations: Vec<f32>, looping: bool) -> Self {
        assert_eq!(frames.len(), durations.len(), "frames/durations length mismatch");
        Self {
            id: LayerId::next(),
            frames,
            durations,
            current_frame: 0,
            elapsed: 0.0,
            looping,
            on_complete: None,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// Text rendered through the font engine, then treated as a sprite.
#[derive(Debug, Clone)]
pub struct TextLayer {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub color: Rgba,
    pub font_path: Option<PathBuf>,
}

impl TextLayer {
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32, color: Rgba) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_size,
            color,
            font_path: None,
        }
    }
}

/// A drawable. Variants carry their own parameters; z-order is the
/// position in the description's layer list.
#[derive(Debug, Clone)]
pub enum Layer {
    Fill(FillLayer),
    Rect(RectLayer),
    Sprite(SpriteLayer),
    AnimatedSprite(AnimatedSpriteLayer),
    Text(TextLayer),
}

impl Layer {
    pub fn fill(color: Rgba) -> Self {
        Layer::Fill(FillLayer { color })
    }

    pub fn rect(x: f32, y: f32, width: f32, height: f32, color: Rgba) -> Self {
        Layer::Rect(RectLayer {
            x,
            y,
            width,
            height,
            color,
        })
    }

    pub fn sprite(pixels: SpritePixels, x: f32, y: f32) -> Self {
        Layer::Sprite(SpriteLayer::new(pixels, x, y))
    }

    pub fn text(text: impl Into<String>, x: f32, y: f32, font_size: f32, color: Rgba) -> Self {
        Layer::Text(TextLayer::new(text, x, y, font_size, color))
    }

    /// Identity for sprite-like layers; `None` for the rest.
    pub fn id(&self) -> Option<LayerId> {
        match self {
            Layer::Sprite(s) => Some(s.id),
            Layer::AnimatedSprite(s) => Some(s.id),
            _ => None,
        }
    }

    /// Screen position for layers that have one.
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Layer::Rect(r) => Some((r.x, r.y)),
            Layer::Sprite(s) => Some((s.x, s.y)),
            Layer::AnimatedSprite(s) => Some((s.x, s.y)),
            Layer::Text(t) => Some((t.x, t.y)),
            Layer::Fill(_) => None,
        }
    }

    /// Move a positioned layer. No-op for fills.
    pub fn set_position(&mut self, x: f32, y: f32) {
        match self {
            Layer::Rect(r) => {
                r.x = x;
                r.y = y;
            }
            Layer::Sprite(s) => {
                s.x = x;
                s.y = y;
            }
            Layer::AnimatedSprite(s) => {
                s.x = x;
                s.y = y;
            }
            Layer::Text(t) => {
                t.x = x;
                t.y = y;
            }
            Layer::Fill(_) => {}
        }
    }

    /// Whether the pre-effects (Wiggle) treat this layer as a sprite.
    pub fn is_sprite(&self) -> bool {
        matches!(self, Layer::Sprite(_) | Layer::AnimatedSprite(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_ids_are_unique() {
        let a = LayerId::next();
        let b = LayerId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn id_survives_clone() {
        let layer = Layer::sprite(SpritePixels::solid(2, 2, Rgba::WHITE), 0.0, 0.0);
        let clone = layer.clone();
        assert_eq!(layer.id(), clone.id());
    }

    #[test]
    #[should_panic(expected = "sprite buffer size mismatch")]
    fn sprite_pixels_checks_length() {
        SpritePixels::new(2, 2, vec![0; 15]);
    }

    #[test]
    fn set_position_moves_sprites() {
        let mut layer = Layer::sprite(SpritePixels::solid(1, 1, Rgba::WHITE), 1.0, 2.0);
        layer.set_position(3.0, 4.0);
        assert_eq!(layer.position(), Some((3.0, 4.0)));
    }
}
