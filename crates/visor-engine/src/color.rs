//! Color types and conversions shared by layers, effects, and the LED strip.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An 8-bit RGBA color. Serialized as a `[r, g, b, a]` tuple so event and
/// effect payloads stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "[u8; 4]", from = "[u8; 4]")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from RGB channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// The RGB channels as an array, alpha dropped.
    pub const fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Normalized alpha in [0, 1].
    pub fn alpha_f32(self) -> f32 {
        f32::from(self.a) / 255.0
    }
}

impl From<[u8; 4]> for Rgba {
    fn from(v: [u8; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Rgba> for [u8; 4] {
    fn from(c: Rgba) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("invalid hex color '{0}': expected #RRGGBB or #RRGGBBAA")]
    InvalidHex(String),
}

/// Parses `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
pub fn parse_hex(input: &str) -> Result<Rgba, ColorParseError> {
    let hex = input.strip_prefix('#').unwrap_or(input);
    let bad = || ColorParseError::InvalidHex(input.to_string());
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
    match hex.len() {
        6 => Ok(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Ok(Rgba::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => Err(bad()),
    }
}

/// HSV to 8-bit RGB. Hue wraps in [0, 1); saturation and value in [0, 1].
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let h = (h.rem_euclid(1.0)) * 6.0;
    let i = h as u32 % 6;
    let f = h - h.floor();

    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match i {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    [
        (r * 255.0) as u8,
        (g * 255.0) as u8,
        (b * 255.0) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_rgb_and_rgba() {
        assert_eq!(parse_hex("#FF0080"), Ok(Rgba::rgb(255, 0, 128)));
        assert_eq!(parse_hex("00ff0040"), Ok(Rgba::new(0, 255, 0, 64)));
        assert!(parse_hex("#123").is_err());
        assert!(parse_hex("#ZZZZZZ").is_err());
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [255, 0, 0]);
        assert_eq!(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0), [0, 255, 0]);
        assert_eq!(hsv_to_rgb(2.0 / 3.0, 1.0, 1.0), [0, 0, 255]);
    }

    #[test]
    fn hsv_hue_wraps() {
        assert_eq!(hsv_to_rgb(1.5, 1.0, 1.0), hsv_to_rgb(0.5, 1.0, 1.0));
    }

    #[test]
    fn rgba_serde_roundtrip() {
        let c = Rgba::new(1, 2, 3, 4);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "[1,2,3,4]");
        assert_eq!(serde_json::from_str::<Rgba>(&json).unwrap(), c);
    }
}
