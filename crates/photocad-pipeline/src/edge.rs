//! Edge detection: grayscale buffer in, binary edge mask out.
//!
//! Gradients are computed with [`imageproc::filter::filter_clamped`]
//! over the luminance channel. Only interior pixels are classified; the
//! 1-pixel border is always black, so the clamped border samples never
//! reach the output.
//!
//! The mask keeps the RGBA layout: 255 (edge) or 0 (background) in R, G
//! and B, alpha 255.

use std::fmt;
use std::str::FromStr;

use image::{GrayImage, Luma, Rgba};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel::{self, Kernel};
use serde::{Deserialize, Serialize};

use crate::types::{PipelineError, PixelBuffer};

/// Intensity written for edge pixels.
pub const EDGE: u8 = 255;

/// 4-neighbour Laplacian.
const LAPLACIAN_3X3: [i32; 9] = [0, -1, 0, -1, 4, -1, 0, -1, 0];

/// Selects which edge operator to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMethod {
    /// Accepted for compatibility; currently runs the Sobel operator.
    ///
    /// No blur, non-maximum suppression or hysteresis is applied.
    Canny,
    /// Sobel gradient magnitude `sqrt(Gx² + Gy²)` against the threshold.
    #[default]
    Sobel,
    /// Absolute 4-neighbour Laplacian response against the threshold.
    Laplacian,
}

impl EdgeMethod {
    /// Lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Canny => "canny",
            Self::Sobel => "sobel",
            Self::Laplacian => "laplacian",
        }
    }
}

impl fmt::Display for EdgeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "canny" => Ok(Self::Canny),
            "sobel" => Ok(Self::Sobel),
            "laplacian" => Ok(Self::Laplacian),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown edge method {other:?} (expected canny, sobel or laplacian)"
            ))),
        }
    }
}

/// Run `method` over a grayscale buffer and threshold the response.
///
/// `threshold` is a raw gradient magnitude, not normalized. A pixel is
/// an edge when its response is strictly greater than `threshold`.
///
/// This is step 2 in the pipeline, between grayscale reduction and line
/// tracing.
#[must_use = "returns the binary edge mask"]
pub fn detect_edges(gray: &PixelBuffer, method: EdgeMethod, threshold: f64) -> PixelBuffer {
    let luma = luminance_channel(gray);
    match method {
        EdgeMethod::Canny => {
            log::debug!("canny edge method runs the sobel operator");
            sobel(&luma, threshold)
        }
        EdgeMethod::Sobel => sobel(&luma, threshold),
        EdgeMethod::Laplacian => laplacian(&luma, threshold),
    }
}

/// Sobel magnitude thresholding.
fn sobel(luma: &GrayImage, threshold: f64) -> PixelBuffer {
    let gx: Image<Luma<i16>> = filter_clamped(luma, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(luma, kernel::SOBEL_VERTICAL_3X3);
    binarize_interior(
        luma.width(),
        luma.height(),
        |x, y| f64::from(gx.get_pixel(x, y).0[0]).hypot(f64::from(gy.get_pixel(x, y).0[0])),
        threshold,
    )
}

/// Laplacian magnitude thresholding.
fn laplacian(luma: &GrayImage, threshold: f64) -> PixelBuffer {
    let response: Image<Luma<i16>> = filter_clamped(luma, Kernel::new(&LAPLACIAN_3X3, 3, 3));
    binarize_interior(
        luma.width(),
        luma.height(),
        |x, y| f64::from(response.get_pixel(x, y).0[0]).abs(),
        threshold,
    )
}

/// Build an RGBA mask, evaluating `magnitude` on interior pixels only.
fn binarize_interior(
    width: u32,
    height: u32,
    magnitude: impl Fn(u32, u32) -> f64,
    threshold: f64,
) -> PixelBuffer {
    PixelBuffer::from_fn(width, height, |x, y| {
        let interior = x > 0 && y > 0 && x + 1 < width && y + 1 < height;
        let v = if interior && magnitude(x, y) > threshold {
            EDGE
        } else {
            0
        };
        Rgba([v, v, v, 255])
    })
}

/// Pull the R channel of a grayscale RGBA buffer into a `GrayImage`.
fn luminance_channel(gray: &PixelBuffer) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([gray.get_pixel(x, y).0[0]])
    })
}

/// Number of edge pixels in a mask.
#[must_use]
pub fn count_edge_pixels(mask: &PixelBuffer) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] == EDGE)).sum()
}
