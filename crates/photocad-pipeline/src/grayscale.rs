//! Grayscale reduction.
//!
//! Collapses an RGBA buffer to luminance with the Rec. 601 weights
//! `0.299*R + 0.587*G + 0.114*B`, rounded. The result keeps the
//! 4-channel layout (luminance in R, G and B; alpha 255) so it can be
//! drawn straight onto a canvas.
//!
//! This is step 1 in the pipeline, before edge detection.

use image::Rgba;

use crate::types::PixelBuffer;

/// Luminance of one RGB triple, rounded to the nearest integer.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.114f64.mul_add(
        f64::from(b),
        0.299f64.mul_add(f64::from(r), 0.587 * f64::from(g)),
    );
    // The weights sum to 1, so `y` stays within 0..=255.
    y.round().clamp(0.0, 255.0) as u8
}

/// Reduce `image` to grayscale in a freshly allocated buffer.
///
/// The input is never modified. Output dimensions match the input.
#[must_use = "returns the grayscale buffer"]
pub fn grayscale(image: &PixelBuffer) -> PixelBuffer {
    PixelBuffer::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        let v = luminance(r, g, b);
        Rgba([v, v, v, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(r: u8, g: u8, b: u8) -> PixelBuffer {
        PixelBuffer::from_pixel(1, 1, Rgba([r, g, b, 255]))
    }

    #[test]
    fn weighted_formula_per_channel() {
        // 0.299 * 255 = 76.245, 0.587 * 255 = 149.685, 0.114 * 255 = 29.07
        assert_eq!(grayscale(&rgb(255, 0, 0)).get_pixel(0, 0).0, [76, 76, 76, 255]);
        assert_eq!(
            grayscale(&rgb(0, 255, 0)).get_pixel(0, 0).0,
            [150, 150, 150, 255]
        );
        assert_eq!(grayscale(&rgb(0, 0, 255)).get_pixel(0, 0).0, [29, 29, 29, 255]);
    }

    #[test]
    fn white_and_black_are_preserved() {
        assert_eq!(luminance(255, 255, 255), 255);
        assert_eq!(luminance(0, 0, 0), 0);
    }

    #[test]
    fn all_channels_equal_and_alpha_opaque() {
        let img = PixelBuffer::from_fn(16, 9, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 13 + y * 29) as u8;
            Rgba([v, v.wrapping_mul(3), v.wrapping_add(100), 40])
        });
        let gray = grayscale(&img);
        for (x, y, p) in gray.enumerate_pixels() {
            let [r, g, b, a] = p.0;
            assert_eq!(r, g);
            assert_eq!(g, b);
            assert_eq!(a, 255);
            let [ir, ig, ib, _] = img.get_pixel(x, y).0;
            assert_eq!(r, luminance(ir, ig, ib));
        }
    }

    #[test]
    fn reduction_is_idempotent() {
        let img = PixelBuffer::from_fn(32, 8, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 7 + y * 31) as u8;
            Rgba([v, 255 - v, v / 2, 255])
        });
        let once = grayscale(&img);
        let twice = grayscale(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn input_is_not_modified_and_dimensions_match() {
        let img = PixelBuffer::from_pixel(17, 31, Rgba([128, 64, 32, 7]));
        let before = img.clone();
        let gray = grayscale(&img);
        assert_eq!(img, before);
        assert_eq!(gray.dimensions(), (17, 31));
    }
}
