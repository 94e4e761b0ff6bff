//! Background-removed input buffer.
//!
//! The upstream segmentation service hands back an RGBA image whose
//! background has already been knocked out. The pipeline only needs the
//! alpha channel; the color channels are kept for preview rendering.

use crate::types::{Dimensions, PipelineError, RgbaImage};

/// Alpha value at or above which a pixel counts as foreground.
pub const FOREGROUND_ALPHA: u8 = 128;

/// Immutable alpha buffer, optionally with the RGBA source it came from.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
    rgba: Option<RgbaImage>,
}

impl PixelBuffer {
    /// Wrap an RGBA image, extracting its alpha channel.
    #[must_use]
    pub fn from_rgba(image: RgbaImage) -> Self {
        let alpha = image.pixels().map(|p| p.0[3]).collect();
        Self {
            width: image.width(),
            height: image.height(),
            alpha,
            rgba: Some(image),
        }
    }

    /// Build a buffer from a bare row-major alpha plane.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::BufferSize`] if `alpha.len()` is not
    /// `width * height`.
    pub fn from_alpha(width: u32, height: u32, alpha: Vec<u8>) -> Result<Self, PipelineError> {
        let expected = width as usize * height as usize;
        if alpha.len() != expected {
            return Err(PipelineError::BufferSize {
                expected,
                actual: alpha.len(),
            });
        }
        Ok(Self {
            width,
            height,
            alpha,
            rgba: None,
        })
    }

    /// Decode encoded image bytes (PNG, JPEG, BMP, WebP).
    ///
    /// Formats without an alpha channel decode as fully opaque, which
    /// makes the whole frame one object; callers should feed
    /// background-removed images.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
    /// Returns [`PipelineError::ImageDecode`] if the format is
    /// unrecognized or the data is corrupt.
    pub fn decode(bytes: &[u8]) -> Result<Self, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_rgba(image.to_rgba8()))
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Row-major alpha plane.
    #[must_use]
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    /// The RGBA source, when the buffer was built from one.
    #[must_use]
    pub const fn rgba(&self) -> Option<&RgbaImage> {
        self.rgba.as_ref()
    }

    /// Alpha at `(x, y)`. Out-of-range coordinates read as transparent.
    #[must_use]
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.alpha[y as usize * self.width as usize + x as usize]
    }

    /// Whether `(x, y)` is foreground.
    #[must_use]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.alpha_at(x, y) >= FOREGROUND_ALPHA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .ok();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(
            PixelBuffer::decode(&[]),
            Err(PipelineError::EmptyInput)
        ));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        assert!(matches!(
            PixelBuffer::decode(&[0xFF, 0xFE, 0x00, 0x01]),
            Err(PipelineError::ImageDecode(_))
        ));
    }

    #[test]
    fn decoded_png_keeps_alpha() {
        let img = RgbaImage::from_fn(3, 2, |x, _| {
            image::Rgba([10, 20, 30, if x == 1 { 255 } else { 0 }])
        });
        let buffer = PixelBuffer::decode(&encode_png(&img)).unwrap();
        assert_eq!(buffer.dimensions(), Dimensions { width: 3, height: 2 });
        assert!(buffer.is_foreground(1, 0));
        assert!(!buffer.is_foreground(0, 1));
        assert!(buffer.rgba().is_some());
    }

    #[test]
    fn threshold_is_inclusive_at_128() {
        let buffer = PixelBuffer::from_alpha(3, 1, vec![127, 128, 255]).unwrap();
        assert!(!buffer.is_foreground(0, 0));
        assert!(buffer.is_foreground(1, 0));
        assert!(buffer.is_foreground(2, 0));
    }

    #[test]
    fn out_of_range_reads_transparent() {
        let buffer = PixelBuffer::from_alpha(1, 1, vec![255]).unwrap();
        assert_eq!(buffer.alpha_at(1, 0), 0);
        assert_eq!(buffer.alpha_at(0, 5), 0);
    }

    #[test]
    fn mismatched_alpha_length_is_rejected() {
        let err = PixelBuffer::from_alpha(2, 2, vec![0; 3]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::BufferSize {
                expected: 4,
                actual: 3
            }
        ));
    }
}
