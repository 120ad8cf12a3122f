//! Pixel buffer construction.
//!
//! Two ways in: raw RGBA bytes from a canvas-style host, or encoded
//! image bytes (PNG, JPEG, BMP, WebP) from a file or upload. Both
//! produce a [`PixelBuffer`]; nothing downstream ever resizes it.

use crate::types::{PixelBuffer, PipelineError};

/// Bytes per RGBA pixel.
const CHANNELS: usize = 4;

/// Wrap raw RGBA bytes as a pixel buffer.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if `bytes` does not hold
/// exactly `width * height * 4` samples.
pub fn pixel_buffer_from_raw(
    width: u32,
    height: u32,
    bytes: Vec<u8>,
) -> Result<PixelBuffer, PipelineError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS));
    if expected != Some(bytes.len()) {
        return Err(PipelineError::InvalidBuffer(format!(
            "{} bytes cannot describe a {width}x{height} RGBA image",
            bytes.len()
        )));
    }
    PixelBuffer::from_raw(width, height, bytes).ok_or_else(|| {
        PipelineError::InvalidBuffer(format!("{width}x{height} RGBA buffer rejected"))
    })
}

/// Decode encoded image bytes into an RGBA pixel buffer.
///
/// Supports whatever the `image` crate was built with (PNG, JPEG, BMP,
/// WebP).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    log::debug!("decoded {}x{} image", img.width(), img.height());
    Ok(img.to_rgba8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &PixelBuffer) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn raw_buffer_with_matching_length() {
        let buffer = pixel_buffer_from_raw(2, 3, vec![7; 24]).unwrap();
        assert_eq!(buffer.dimensions(), (2, 3));
        assert_eq!(buffer.get_pixel(1, 2).0, [7, 7, 7, 7]);
    }

    #[test]
    fn raw_buffer_with_wrong_length_is_rejected() {
        let result = pixel_buffer_from_raw(2, 2, vec![0; 15]);
        assert!(matches!(result, Err(PipelineError::InvalidBuffer(_))));
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn png_round_trips_through_decode() {
        let img = PixelBuffer::from_fn(17, 31, |x, y| {
            image::Rgba([u8::try_from(x).unwrap(), u8::try_from(y).unwrap(), 9, 255])
        });
        let decoded = decode(&encode_png(&img)).unwrap();
        assert_eq!(decoded, img);
    }
}
