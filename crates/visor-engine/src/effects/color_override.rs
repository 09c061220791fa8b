//! ColorOverride post-effect: recolor every lit pixel to a base color
//! scaled by its brightness, with optional diagonal glare bands.

use serde::{Deserialize, Serialize};

use crate::effects::rng::Rng;
use crate::render::frame::Frame;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorOverrideEffect {
    pub base_color: [u8; 3],
    pub glare_enabled: bool,
    pub glare_color: [u8; 3],
    /// Glare blend strength in [0, 1].
    pub glare_intensity: f32,
    /// Number of diagonal bands.
    pub glare_count: usize,
    pub seed: Option<u64>,
    #[serde(skip)]
    bands: Option<Vec<GlareBand>>,
}

/// Position of one glare band along the screen diagonal, with its
/// Gaussian width. Fixed once at first application.
#[derive(Debug, Clone, Copy)]
struct GlareBand {
    center: f32,
    width: f32,
}

impl Default for ColorOverrideEffect {
    fn default() -> Self {
        Self {
            base_color: [255, 255, 255],
            glare_enabled: true,
            glare_color: [255, 255, 255],
            glare_intensity: 0.6,
            glare_count: 3,
            seed: None,
            bands: None,
        }
    }
}

impl ColorOverrideEffect {
    pub fn apply(&mut self, frame: &mut Frame, _dt: f32) {
        let width = frame.width();
        let height = frame.height();
        if width == 0 || height == 0 {
            return;
        }

        let bands = if self.glare_enabled {
            let seed = self.seed;
            let count = self.glare_count;
            self.bands
                .get_or_insert_with(|| {
                    let mut rng = match seed {
                        Some(s) => Rng::new(s),
                        None => Rng::from_time(),
                    };
                    (0..count)
                        .map(|_| GlareBand {
                            center: rng.range(0.0, 1.0),
                            width: rng.range(0.05, 0.15),
                        })
                        .collect()
                })
                .clone()
        } else {
            Vec::new()
        };

        let base = [
            f32::from(self.base_color[0]),
            f32::from(self.base_color[1]),
            f32::from(self.base_color[2]),
        ];
        let glare = [
            f32::from(self.glare_color[0]),
            f32::from(self.glare_color[1]),
            f32::from(self.glare_color[2]),
        ];

        for y in 0..height {
            for x in 0..width {
                let px = frame.pixel(x, y);
                let brightness = px[0].max(px[1]).max(px[2]);
                if brightness == 0 {
                    continue;
                }

                let value = f32::from(brightness) / 255.0;
                let mut out = [base[0] * value, base[1] * value, base[2] * value];

                // Diagonal coordinate in [0, 1].
                let diagonal = (y as f32 / height.max(1) as f32
                    + x as f32 / width.max(1) as f32)
                    / 2.0;
                for band in &bands {
                    let distance = (diagonal - band.center).abs();
                    let gradient = (-distance * distance / (2.0 * band.width * band.width)).exp();
                    for c in 0..3 {
                        let blended = base[c] * (1.0 - gradient) + glare[c] * gradient;
                        out[c] = out[c] * (1.0 - self.glare_intensity)
                            + blended * self.glare_intensity;
                    }
                }

                frame.set_pixel(
                    x,
                    y,
                    [
                        out[0].clamp(0.0, 255.0) as u8,
                        out[1].clamp(0.0, 255.0) as u8,
                        out[2].clamp(0.0, 255.0) as u8,
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
    fn black_pixels_untouched() {
        let mut effect = ColorOverrideEffect {
            base_color: [0, 255, 0],
            glare_enabled: false,
            ..ColorOverrideEffect::default()
        };
        let mut frame = Frame::new(4, 4);
        frame.set_pixel(1, 1, [100, 0, 0]);
        effect.apply(&mut frame, 0.016);
        assert_eq!(frame.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn recolors_scaled_by_brightness() {
        let mut effect = ColorOverrideEffect {
            base_color: [0, 200, 0],
            glare_enabled: false,
            ..ColorOverrideEffect::default()
        };
        let mut frame = Frame::new(2, 1);
        frame.set_pixel(0, 0, [128, 0, 0]); // brightness 128
        frame.set_pixel(1, 0, [255, 255, 255]); // brightness 255
        effect.apply(&mut frame, 0.016);
        let dim = frame.pixel(0, 0);
        let bright = frame.pixel(1, 0);
        assert!((i16::from(dim[1]) - 100).abs() <= 1);
        assert_eq!(dim[0], 0);
        assert!((i16::from(bright[1]) - 200).abs() <= 1);
    }

    #[test]
    fn glare_positions_are_stable_with_seed() {
        let mut a = ColorOverrideEffect {
            seed: Some(33),
            ..ColorOverrideEffect::default()
        };
        let mut b = ColorOverrideEffect {
            seed: Some(33),
            ..ColorOverrideEffect::default()
        };
        let mut fa = Frame::new(8, 8);
        fa.fill([255, 255, 255]);
        let mut fb = fa.clone();
        a.apply(&mut fa, 0.016);
        b.apply(&mut fb, 0.016);
        assert_eq!(fa, fb);

        // Applying again does not move the bands.
        let mut fa2 = Frame::new(8, 8);
        fa2.fill([255, 255, 255]);
        a.apply(&mut fa2, 0.016);
        assert_eq!(fa, fa2);
    }
}
