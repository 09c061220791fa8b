//! Sub-pixel sprite rasterization.
//!
//! Sprites land on fractional coordinates. Each source pixel is
//! premultiplied by alpha and distributed over the four destination
//! cells it overlaps, accumulated in an expanded `(h+1)×(w+1)` float
//! buffer. Destination pixels whose accumulated alpha clears the write
//! threshold get the un-premultiplied color; the rest stay untouched.
//! The result is hard edges with interpolated interior color.

use crate::render::frame::Frame;

/// Accumulated alpha must exceed this to produce an opaque write.
pub const ALPHA_WRITE_THRESHOLD: f32 = 0.5;

/// Draw an RGBA bitmap (`w`×`h`, row-major) onto the frame at fractional
/// `(x, y)`. Out-of-bounds regions are clipped.
pub fn draw_subpixel_sprite(frame: &mut Frame, data: &[u8], w: usize, h: usize, x: f32, y: f32) {
    debug_assert_eq!(data.len(), w * h * 4);
    if w == 0 || h == 0 {
        return;
    }

    let x_int = x.floor() as i64;
    let y_int = y.floor() as i64;
    let fx = x - x.floor();
    let fy = y - y.floor();

    let w00 = (1.0 - fx) * (1.0 - fy);
    let w10 = fx * (1.0 - fy);
    let w01 = (1.0 - fx) * fy;
    let w11 = fx * fy;

    // Premultiplied accumulation buffer, one cell larger on each axis.
    let ew = w + 1;
    let eh = h + 1;
    let mut expanded = vec![[0.0f32; 4]; ew * eh];

    for sy in 0..h {
        for sx in 0..w {
            let i = (sy * w + sx) * 4;
            let a = f32::from(data[i + 3]);
            let an = a / 255.0;
            let px = [
                f32::from(data[i]) * an,
                f32::from(data[i + 1]) * an,
                f32::from(data[i + 2]) * an,
                a,
            ];
            for (weight, dx, dy) in [(w00, 0, 0), (w10, 1, 0), (w01, 0, 1), (w11, 1, 1)] {
                if weight == 0.0 {
                    continue;
                }
                let cell = &mut expanded[(sy + dy) * ew + sx + dx];
                for c in 0..4 {
                    cell[c] += px[c] * weight;
                }
            }
        }
    }

    let fw = frame.width() as i64;
    let fh = frame.height() as i64;
    let dst_x_start = x_int.max(0);
    let dst_y_start = y_int.max(0);
    let dst_x_end = (x_int + ew as i64).min(fw);
    let dst_y_end = (y_int + eh as i64).min(fh);
    if dst_x_start >= dst_x_end || dst_y_start >= dst_y_end {
        return;
    }

    for dy in dst_y_start..dst_y_end {
        for dx in dst_x_start..dst_x_end {
            let ex = (dx - x_int) as usize;
            let ey = (dy - y_int) as usize;
            let cell = expanded[ey * ew + ex];
            let alpha = cell[3] / 255.0;
            if alpha <= ALPHA_WRITE_THRESHOLD {
                continue;
            }
            let safe_alpha = alpha.max(1e-6);
            let rgb = [
                (cell[0] / safe_alpha).clamp(0.0, 255.0) as u8,
                (cell[1] / safe_alpha).clamp(0.0, 255.0) as u8,
                (cell[2] / safe_alpha).clamp(0.0, 255.0) as u8,
            ];
            frame.set_pixel(dx as usize, dy as usize, rgb);
        }
    }
}

/// Bilinearly sample an RGB frame at fractional coordinates. Coordinates
/// are clamped just inside the frame, matching the resampling effects.
pub fn bilinear_sample(frame: &Frame, sx: f32, sy: f32) -> [f32; 3] {
    let w = frame.width();
    let h = frame.height();
    let sx = sx.clamp(0.0, w as f32 - 1.001);
    let sy = sy.clamp(0.0, h as f32 - 1.001);

    let x0 = sx as usize;
    let y0 = sy as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let p00 = frame.pixel(x0, y0);
    let p01 = frame.pixel(x1, y0);
    let p10 = frame.pixel(x0, y1);
    let p11 = frame.pixel(x1, y1);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        out[c] = f32::from(p00[c]) * (1.0 - fx) * (1.0 - fy)
            + f32::from(p01[c]) * fx * (1.0 - fy)
            + f32::from(p10[c]) * (1.0 - fx) * fy
            + f32::from(p11[c]) * fx * fy;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_1x1() -> Vec<u8> {
        vec![255, 255, 255, 255]
    }

    #[test]
    fn integer_position_writes_one_pixel() {
        let mut frame = Frame::new(2, 2);
        draw_subpixel_sprite(&mut frame, &white_1x1(), 1, 1, 0.0, 0.0);
        assert_eq!(frame.pixel(0, 0), [255, 255, 255]);
        assert_eq!(frame.pixel(1, 0), [0, 0, 0]);
        assert_eq!(frame.pixel(0, 1), [0, 0, 0]);
        assert_eq!(frame.pixel(1, 1), [0, 0, 0]);
    }

    #[test]
    fn half_pixel_position_stays_below_threshold() {
        // Each corner accumulates alpha 0.25, below the 0.5 write
        // threshold, so nothing is written.
        let mut frame = Frame::new(2, 2);
        draw_subpixel_sprite(&mut frame, &white_1x1(), 1, 1, 0.5, 0.5);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn horizontal_half_shift_splits_below_threshold() {
        let mut frame = Frame::new(3, 1);
        draw_subpixel_sprite(&mut frame, &white_1x1(), 1, 1, 0.5, 0.0);
        // 0.5 alpha in each of two cells: neither exceeds the threshold.
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn interior_pixels_survive_fractional_offset() {
        // A 2x1 white sprite at x=0.25: the middle cell accumulates
        // 0.75 + 0.25 = full alpha and must be written.
        let data = vec![255, 255, 255, 255, 255, 255, 255, 255];
        let mut frame = Frame::new(4, 1);
        draw_subpixel_sprite(&mut frame, &data, 2, 1, 0.25, 0.0);
        assert_eq!(frame.pixel(1, 0), [255, 255, 255]);
    }

    #[test]
    fn clips_offscreen_sprite() {
        let mut frame = Frame::new(2, 2);
        draw_subpixel_sprite(&mut frame, &white_1x1(), 1, 1, -5.0, -5.0);
        draw_subpixel_sprite(&mut frame, &white_1x1(), 1, 1, 10.0, 10.0);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn bilinear_midpoint_averages() {
        let mut frame = Frame::new(2, 1);
        frame.set_pixel(0, 0, [0, 0, 0]);
        frame.set_pixel(1, 0, [200, 100, 50]);
        let s = bilinear_sample(&frame, 0.5, 0.0);
        assert!((s[0] - 100.0).abs() < 1.0);
        assert!((s[1] - 50.0).abs() < 1.0);
        assert!((s[2] - 25.0).abs() < 1.0);
    }
}
