//! Tile image decoding, encoding and rescaling.
//!
//! Stored tiles are PNG or JPEG. Rescaling works on decoded RGBA pixels and
//! the result is encoded again, as PNG by default so transparency from
//! partially covered composites survives.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageEncoder, ImageFormat, ImageReader, RgbaImage};

use crate::error::TileError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Largest width or height accepted for an output tile.
pub const MAX_TILE_DIMENSION: u32 = 4096;

// =============================================================================
// TileFormat
// =============================================================================

/// Encoded tile image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TileFormat {
    #[default]
    Png,
    Jpeg,
}

impl TileFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            TileFormat::Png => "image/png",
            TileFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpeg => "jpg",
        }
    }

    /// Format for a file extension (`png`, `jpg`, `jpeg`), case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(TileFormat::Png),
            "jpg" | "jpeg" => Some(TileFormat::Jpeg),
            _ => None,
        }
    }

    /// Sniff the format from leading magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match image::guess_format(data).ok()? {
            ImageFormat::Png => Some(TileFormat::Png),
            ImageFormat::Jpeg => Some(TileFormat::Jpeg),
            _ => None,
        }
    }
}

// =============================================================================
// ImageScaler
// =============================================================================

/// Pixel operations needed to rescale tiles.
pub trait ImageScaler: Send + Sync {
    /// Resize to exactly `width` x `height`.
    fn scale(&self, image: &RgbaImage, width: u32, height: u32) -> RgbaImage;

    /// Copy out a sub-rectangle. The rectangle is clipped to the image.
    fn crop(&self, image: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> RgbaImage;
}

/// [`ImageScaler`] backed by `image::imageops`.
#[derive(Debug, Clone, Copy)]
pub struct ResizeScaler {
    filter: FilterType,
}

impl Default for ResizeScaler {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl ResizeScaler {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl ImageScaler for ResizeScaler {
    fn scale(&self, image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        if image.dimensions() == (width, height) {
            return image.clone();
        }
        imageops::resize(image, width, height, self.filter)
    }

    fn crop(&self, image: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> RgbaImage {
        imageops::crop_imm(image, x, y, width, height).to_image()
    }
}

// =============================================================================
// TileImageCodec
// =============================================================================

/// Decodes stored tile bytes and encodes rendered tiles.
#[derive(Debug, Clone, Copy)]
pub struct TileImageCodec {
    format: TileFormat,
    jpeg_quality: u8,
}

impl Default for TileImageCodec {
    fn default() -> Self {
        Self::new(TileFormat::Png)
    }
}

impl TileImageCodec {
    pub fn new(format: TileFormat) -> Self {
        Self {
            format,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Set JPEG quality, clamped to 1-100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = clamp_quality(quality);
        self
    }

    pub fn format(&self) -> TileFormat {
        self.format
    }

    /// Decode PNG or JPEG bytes to RGBA pixels.
    pub fn decode(&self, source: &[u8]) -> Result<RgbaImage, TileError> {
        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| TileError::DecodeError {
                message: e.to_string(),
            })?;

        let img = reader.decode().map_err(|e| TileError::DecodeError {
            message: e.to_string(),
        })?;

        Ok(img.into_rgba8())
    }

    /// Encode RGBA pixels in this codec's format.
    pub fn encode(&self, image: &RgbaImage) -> Result<Bytes, TileError> {
        let mut output = Vec::new();
        let (width, height) = image.dimensions();

        let result = match self.format {
            TileFormat::Png => PngEncoder::new(&mut output).write_image(
                image.as_raw(),
                width,
                height,
                image::ExtendedColorType::Rgba8,
            ),
            TileFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
                JpegEncoder::new_with_quality(&mut output, self.jpeg_quality).encode_image(&rgb)
            }
        };

        result.map_err(|e| TileError::EncodeError {
            message: e.to_string(),
        })?;

        Ok(Bytes::from(output))
    }

    /// Image dimensions without decoding pixel data.
    pub fn dimensions(&self, source: &[u8]) -> Result<(u32, u32), TileError> {
        ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| TileError::DecodeError {
                message: e.to_string(),
            })?
            .into_dimensions()
            .map_err(|e| TileError::DecodeError {
                message: e.to_string(),
            })
    }
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

/// Check requested output dimensions.
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), TileError> {
    if width == 0 || height == 0 || width > MAX_TILE_DIMENSION || height > MAX_TILE_DIMENSION {
        return Err(TileError::InvalidDimensions { width, height });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
