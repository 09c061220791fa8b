//! TrueType text rasterization.
//!
//! Text layers are rasterized into tight RGBA bitmaps with `fontdue`,
//! then drawn through the same sub-pixel sprite path as any other
//! bitmap. Loaded fonts and rasterized lines are cached; the line cache
//! is bounded and simply dropped when it grows past its cap.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fontdue::layout::{CoordinateSystem, Layout, TextStyle};
use fontdue::{Font, FontSettings};
use thiserror::Error;

use crate::color::Rgba;
use crate::render::layer::SpritePixels;

/// Font used when a text layer names none.
pub const DEFAULT_FONT_PATH: &str = "assets/font.ttf";

/// Rasterized lines kept before the cache is flushed.
const LINE_CACHE_CAP: usize = 256;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read font '{path}': {source}")]
    FontRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse font '{path}': {reason}")]
    FontParse { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LineKey {
    text: String,
    size_bits: u32,
    color: [u8; 4],
    font: Option<PathBuf>,
}

/// Loads fonts on demand and rasterizes text lines into RGBA sprites.
pub struct FontStore {
    fonts: HashMap<PathBuf, Font>,
    lines: HashMap<LineKey, SpritePixels>,
}

impl FontStore {
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            lines: HashMap::new(),
        }
    }

    /// Rasterize `text` at `px` pixels into a tight RGBA bitmap.
    /// Returns `None` when nothing is visible (empty or all-whitespace
    /// text). Font resolution order: explicit path, then the default.
    pub fn rasterize(
        &mut self,
        text: &str,
        px: f32,
        color: Rgba,
        font_path: Option<&Path>,
    ) -> Result<Option<SpritePixels>, AssetError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let path = font_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FONT_PATH));

        let key = LineKey {
            text: text.to_string(),
            size_bits: px.to_bits(),
            color: color.into(),
            font: Some(path.clone()),
        };
        if let Some(hit) = self.lines.get(&key) {
            return Ok(Some(hit.clone()));
        }

        if !self.fonts.contains_key(&path) {
            let bytes = fs::read(&path).map_err(|source| AssetError::FontRead {
                path: path.clone(),
                source,
            })?;
            let font =
                Font::from_bytes(bytes, FontSettings::default()).map_err(|reason| {
                    AssetError::FontParse {
                        path: path.clone(),
                        reason: reason.to_string(),
                    }
                })?;
            self.fonts.insert(path.clone(), font);
        }
        let font = &self.fonts[path.as_path()];

        let sprite = match rasterize_line(font, text, px, color) {
            Some(sprite) => sprite,
            None => return Ok(None),
        };

        if self.lines.len() >= LINE_CACHE_CAP {
            self.lines.clear();
        }
        self.lines.insert(key, sprite.clone());
        Ok(Some(sprite))
    }
}

impl Default for FontStore {
    fn default() -> Self {
        Self::new()
    }
}

fn rasterize_line(font: &Font, text: &str, px: f32, color: Rgba) -> Option<SpritePixels> {
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.append(&[font], &TextStyle::new(text, px, 0));

    // Tight bounding box over the glyphs that actually have coverage.
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let mut any = false;
    for g in layout.glyphs() {
        if g.width == 0 || g.height == 0 {
            continue;
        }
        any = true;
        min_x = min_x.min(g.x);
        min_y = min_y.min(g.y);
        max_x = max_x.max(g.x + g.width as f32);
        max_y = max_y.max(g.y + g.height as f32);
    }
    if !any {
        return None;
    }

    let width = (max_x - min_x).ceil() as usize;
    let height = (max_y - min_y).ceil() as usize;
    let mut data = vec![0u8; width * height * 4];

    for g in layout.glyphs() {
        if g.width == 0 || g.height == 0 {
            continue;
        }
        let (_, coverage) = font.rasterize_config(g.key);
        let gx = (g.x - min_x).round() as usize;
        let gy = (g.y - min_y).round() as usize;
        for row in 0..g.height {
            for col in 0..g.width {
                let dx = gx + col;
                let dy = gy + row;
                if dx >= width || dy >= height {
                    continue;
                }
                let cov = coverage[row * g.width + col];
                let alpha = ((u16::from(cov) * u16::from(color.a)) / 255) as u8;
                let i = (dy * width + dx) * 4;
                data[i] = color.r;
                data[i + 1] = color.g;
                data[i + 2] = color.b;
                // Overlapping glyph boxes keep the stronger coverage.
                data[i + 3] = data[i + 3].max(alpha);
            }
        }
    }

    Some(SpritePixels::new(width, height, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_renders_nothing() {
        let mut store = FontStore::new();
        let out = store.rasterize("   ", 8.0, Rgba::WHITE, None).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn missing_font_is_an_error() {
        let mut store = FontStore::new();
        let err = store
            .rasterize("hi", 8.0, Rgba::WHITE, Some(Path::new("/nonexistent/font.ttf")))
            .unwrap_err();
        assert!(matches!(err, AssetError::FontRead { .. }));
    }
}
