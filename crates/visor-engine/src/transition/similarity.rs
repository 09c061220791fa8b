//! Shape similarity between two images, used to pick transition types.
//!
//! Images are binarized by luminance (alpha-weighted for RGBA) and
//! compared structurally: intersection-over-union of the masks, the
//! ratio of mask sizes, and a center-of-mass distance penalty.

use crate::render::frame::Frame;

/// Luminance above which a pixel counts as "on" (normalized units).
pub const BINARIZE_LUMA: f32 = 0.5;

/// Mean brightness the source must exceed for a bright→dark call.
pub const BRIGHT_FROM_MEAN: f32 = 0.4;

/// Mean brightness the destination must stay under for a bright→dark call.
pub const DARK_TO_MEAN: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

/// Borrowed view over RGB or RGBA pixel data.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    format: PixelFormat,
}

impl<'a> ImageView<'a> {
    pub fn rgb(data: &'a [u8], width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * 3);
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgb,
        }
    }

    pub fn rgba(data: &'a [u8], width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * 4);
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba,
        }
    }

    pub fn of_frame(frame: &'a Frame) -> Self {
        Self::rgb(frame.as_bytes(), frame.width(), frame.height())
    }

    fn stride(&self) -> usize {
        match self.format {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    /// Alpha-weighted luminance, 0..255 scale.
    fn luminance(&self, x: usize, y: usize) -> f32 {
        let i = (y * self.width + x) * self.stride();
        let luma = 0.299 * f32::from(self.data[i])
            + 0.587 * f32::from(self.data[i + 1])
            + 0.114 * f32::from(self.data[i + 2]);
        match self.format {
            PixelFormat::Rgb => luma,
            PixelFormat::Rgba => luma * (f32::from(self.data[i + 3]) / 255.0),
        }
    }

    /// Mean over the color channels (alpha excluded), normalized to [0, 1].
    fn mean_rgb(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        let stride = self.stride();
        let mut sum = 0u64;
        for px in self.data.chunks_exact(stride) {
            sum += u64::from(px[0]) + u64::from(px[1]) + u64::from(px[2]);
        }
        sum as f32 / ((self.width * self.height * 3) as f32 * 255.0)
    }
}

/// Similarity in [0, 1]: `0.7·IoU + 0.2·size_ratio − 0.1·center_penalty`.
/// Two empty masks compare as identical; mismatched dimensions as 0.
pub fn calculate_image_similarity(a: ImageView<'_>, b: ImageView<'_>) -> f32 {
    if a.width != b.width || a.height != b.height {
        return 0.0;
    }

    let mut intersection = 0u32;
    let mut union = 0u32;
    let mut count_a = 0u32;
    let mut count_b = 0u32;
    let mut center_a = [0.0f64; 2];
    let mut center_b = [0.0f64; 2];

    for y in 0..a.height {
        for x in 0..a.width {
            let on_a = a.luminance(x, y) / 255.0 > BINARIZE_LUMA;
            let on_b = b.luminance(x, y) / 255.0 > BINARIZE_LUMA;
            if on_a && on_b {
                intersection += 1;
            }
            if on_a || on_b {
                union += 1;
            }
            if on_a {
                count_a += 1;
                center_a[0] += x as f64;
                center_a[1] += y as f64;
            }
            if on_b {
                count_b += 1;
                center_b[0] += x as f64;
                center_b[1] += y as f64;
            }
        }
    }

    if union == 0 {
        return 1.0;
    }

    let iou = intersection as f32 / union as f32;

    let max_count = count_a.max(count_b);
    let size_similarity = if max_count == 0 {
        1.0
    } else {
        count_a.min(count_b) as f32 / max_count as f32
    };

    let distance_penalty = if count_a > 0 && count_b > 0 {
        let ca = [center_a[0] / f64::from(count_a), center_a[1] / f64::from(count_a)];
        let cb = [center_b[0] / f64::from(count_b), center_b[1] / f64::from(count_b)];
        let distance = ((ca[0] - cb[0]).powi(2) + (ca[1] - cb[1]).powi(2)).sqrt() as f32;
        let diag = ((a.width * a.width + a.height * a.height) as f32).sqrt();
        (distance / diag * 0.5).min(0.3)
    } else if count_a != count_b {
        0.3
    } else {
        0.0
    };

    (iou * 0.7 + size_similarity * 0.2 - distance_penalty * 0.1).clamp(0.0, 1.0)
}

/// Whether a transition goes from a bright image to a near-black one.
pub fn is_bright_to_dark(from: ImageView<'_>, to: ImageView<'_>) -> bool {
    from.mean_rgb() > BRIGHT_FROM_MEAN && to.mean_rgb() < DARK_TO_MEAN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_filled(w: usize, h: usize, rgb: [u8; 3]) -> Frame {
        let mut f = Frame::new(w, h);
        f.fill(rgb);
        f
    }

    #[test]
    fn identical_nonempty_images_score_at_weight_ceiling() {
        // IoU and size weights sum to 0.9; identical non-empty masks
        // land exactly there.
        let mut f = Frame::new(8, 8);
        f.set_pixel(2, 2, [255, 255, 255]);
        f.set_pixel(3, 3, [255, 255, 255]);
        let s = calculate_image_similarity(ImageView::of_frame(&f), ImageView::of_frame(&f));
        assert!((s - 0.9).abs() < 1e-6, "score was {s}");
    }

    #[test]
    fn both_empty_score_one() {
        let a = Frame::new(4, 4);
        let b = Frame::new(4, 4);
        let s = calculate_image_similarity(ImageView::of_frame(&a), ImageView::of_frame(&b));
        assert_eq!(s, 1.0);
    }

    #[test]
    fn empty_vs_nonempty_scores_low() {
        let a = Frame::new(8, 8);
        let b = frame_filled(8, 8, [255, 255, 255]);
        let s = calculate_image_similarity(ImageView::of_frame(&a), ImageView::of_frame(&b));
        assert!(s <= 0.3, "score was {}", s);
    }

    #[test]
    fn mismatched_shapes_score_zero() {
        let a = Frame::new(4, 4);
        let b = Frame::new(8, 8);
        assert_eq!(
            calculate_image_similarity(ImageView::of_frame(&a), ImageView::of_frame(&b)),
            0.0
        );
    }

    #[test]
    fn alpha_masks_rgba_luminance() {
        // Fully transparent white reads as dark.
        let data = vec![255, 255, 255, 0];
        let view = ImageView::rgba(&data, 1, 1);
        assert_eq!(view.luminance(0, 0), 0.0);
    }

    #[test]
    fn bright_to_dark_predicate() {
        let white = frame_filled(4, 4, [255, 255, 255]);
        let black = Frame::new(4, 4);
        assert!(is_bright_to_dark(
            ImageView::of_frame(&white),
            ImageView::of_frame(&black)
        ));
        assert!(!is_bright_to_dark(
            ImageView::of_frame(&black),
            ImageView::of_frame(&black)
        ));
        assert!(!is_bright_to_dark(
            ImageView::of_frame(&black),
            ImageView::of_frame(&white)
        ));
    }
}
