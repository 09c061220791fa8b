//! LED strip derivation.
//!
//! When a rainbow effect is running the strip mirrors it: a hue ramp
//! across the LEDs rotated by the effect's phase. Otherwise the strip
//! fills with the dominant (quantized, non-black) color of the frame,
//! memoized in a small FIFO cache keyed by frame content.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::f32::consts::TAU;
use std::hash::{Hash, Hasher};

use crate::color::hsv_to_rgb;
use crate::effects::RainbowSync;
use crate::render::Frame;

/// Dominant-color cache entries kept before the oldest is dropped.
const COLOR_CACHE_CAP: usize = 100;

/// Rainbow speeds at or below this are treated as "no rainbow".
const RAINBOW_MIN_SPEED: f32 = 0.001;

/// Derives per-LED colors for the attached strip.
#[derive(Debug)]
pub struct LedStrip {
    led_count: usize,
    cache: HashMap<u64, [u8; 3]>,
    cache_order: VecDeque<u64>,
}

impl LedStrip {
    pub fn new(led_count: usize) -> Self {
        Self {
            led_count,
            cache: HashMap::new(),
            cache_order: VecDeque::new(),
        }
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    /// Produce `led_count * 3` RGB bytes for the strip.
    pub fn derive(&mut self, frame: &Frame, rainbow: Option<RainbowSync>) -> Vec<u8> {
        let mut pixels = vec![0u8; self.led_count * 3];

        match rainbow {
            Some(sync) if sync.speed > RAINBOW_MIN_SPEED => {
                let phase_turn = sync.phase / TAU;
                for i in 0..self.led_count {
                    let hue = (i as f32 / self.led_count as f32 + phase_turn).rem_euclid(1.0);
                    let rgb = hsv_to_rgb(hue, 1.0, 1.0);
                    pixels[i * 3..i * 3 + 3].copy_from_slice(&rgb);
                }
            }
            _ => {
                let color = self.dominant_color(frame);
                for led in pixels.chunks_exact_mut(3) {
                    led.copy_from_slice(&color);
                }
            }
        }
        pixels
    }

    /// Most frequent non-black color, quantized to 16-value buckets per
    /// channel. Black when the frame is entirely dark.
    pub fn dominant_color(&mut self, frame: &Frame) -> [u8; 3] {
        let mut hasher = DefaultHasher::new();
        frame.as_bytes().hash(&mut hasher);
        let key = hasher.finish();
        if let Some(&hit) = self.cache.get(&key) {
            return hit;
        }

        let color = dominant_quantized_color(frame.as_bytes());

        if self.cache_order.len() >= COLOR_CACHE_CAP {
            if let Some(oldest) = self.cache_order.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        self.cache.insert(key, color);
        self.cache_order.push_back(key);
        color
    }
}

fn dominant_quantized_color(pixels: &[u8]) -> [u8; 3] {
    let triples: &[[u8; 3]] = bytemuck::cast_slice(pixels);
    let mut counts: HashMap<[u8; 3], u32> = HashMap::new();
    for px in triples {
        if px[0] == 0 && px[1] == 0 && px[2] == 0 {
            continue;
        }
        let quantized = [px[0] & 0xF0, px[1] & 0xF0, px[2] & 0xF0];
        *counts.entry(quantized).or_insert(0) += 1;
    }

    counts
        .into_iter()
        // Deterministic tie-break: highest count, then lowest color.
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(color, _)| color)
        .unwrap_or([0, 0, 0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::RainbowSync;

    #[test]
    fn dominant_color_picks_most_frequent_quantized() {
        // 40 pixels of (250,0,0) → bucket (240,0,0); 20 of (10,250,0)
        // → bucket (0,240,0); rest black.
        let mut frame = Frame::new(8, 8);
        let mut painted = 0;
        'outer: for y in 0..8 {
            for x in 0..8 {
                if painted < 40 {
                    frame.set_pixel(x, y, [250, 0, 0]);
                } else if painted < 60 {
                    frame.set_pixel(x, y, [10, 250, 0]);
                } else {
                    break 'outer;
                }
                painted += 1;
            }
        }

        let mut strip = LedStrip::new(10);
        assert_eq!(strip.dominant_color(&frame), [240, 0, 0]);

        let pixels = strip.derive(&frame, None);
        assert_eq!(pixels.len(), 30);
        assert_eq!(&pixels[0..3], &[240, 0, 0]);
        assert_eq!(&pixels[27..30], &[240, 0, 0]);
    }

    #[test]
    fn all_black_frame_yields_black_strip() {
        let frame = Frame::new(4, 4);
        let mut strip = LedStrip::new(5);
        assert_eq!(strip.dominant_color(&frame), [0, 0, 0]);
    }

    #[test]
    fn rainbow_sync_distributes_hues() {
        let frame = Frame::new(4, 4);
        let mut strip = LedStrip::new(6);
        let pixels = strip.derive(
            &frame,
            Some(RainbowSync {
                speed: 1.0,
                phase: 0.0,
            }),
        );
        // LED 0 at hue 0 is pure red; LED 2 at hue 1/3 is pure green.
        assert_eq!(&pixels[0..3], &[255, 0, 0]);
        assert_eq!(&pixels[6..9], &[0, 255, 0]);
    }

    #[test]
    fn rainbow_phase_rotates_strip() {
        let frame = Frame::new(2, 2);
        let mut strip = LedStrip::new(6);
        let shifted = strip.derive(
            &frame,
            Some(RainbowSync {
                speed: 1.0,
                phase: TAU / 3.0,
            }),
        );
        // Phase of a third of a turn moves green onto LED 0.
        assert_eq!(&shifted[0..3], &[0, 255, 0]);
    }

    #[test]
    fn near_zero_rainbow_speed_falls_back_to_dominant() {
        let mut frame = Frame::new(2, 2);
        frame.fill([100, 0, 0]);
        let mut strip = LedStrip::new(3);
        let pixels = strip.derive(
            &frame,
            Some(RainbowSync {
                speed: 0.0005,
                phase: 1.0,
            }),
        );
        assert_eq!(&pixels[0..3], &[96, 0, 0]); // 100 & 0xF0
    }

    #[test]
    fn cache_is_bounded() {
        let mut strip = LedStrip::new(1);
        for i in 0..150u32 {
            let mut frame = Frame::new(2, 2);
            frame.fill([((i % 255) + 1) as u8, 0, 0]);
            strip.dominant_color(&frame);
        }
        assert!(strip.cache.len() <= COLOR_CACHE_CAP);
    }
}
