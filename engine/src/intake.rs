//! Validation and normalization of uploaded images.
//!
//! Everything the caller can get wrong is rejected here, before any
//! collaborator is contacted.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use nutrilens_providers::ClassifierImage;
use nutrilens_types::InvalidUserId;
use thiserror::Error;

/// Uploads wider than this are downscaled before classification.
pub const MAX_WIDTH: u32 = 1200;
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("image is empty")]
    Empty,
    #[error("image could not be decoded: {0}")]
    Undecodable(String),
    #[error("unsupported image format {0}; expected JPEG, PNG, or WebP")]
    UnsupportedFormat(String),
    #[error("image has a zero width or height")]
    Degenerate,
    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] InvalidUserId),
    #[error("image processing was interrupted: {0}")]
    Interrupted(String),
}

/// A decodable, size-normalized image ready for classification.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    bytes: Vec<u8>,
    mime_type: &'static str,
    width: u32,
    height: u32,
}

impl ImageUpload {
    /// Validate and normalize `bytes` on the blocking pool.
    ///
    /// Decoding and re-encoding a large photo takes long enough to stall the
    /// async worker it runs on.
    pub async fn decode(bytes: Vec<u8>) -> Result<Self, InputError> {
        if bytes.is_empty() {
            return Err(InputError::Empty);
        }
        tokio::task::spawn_blocking(move || Self::from_vec(bytes))
            .await
            .map_err(|e| InputError::Interrupted(e.to_string()))?
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InputError> {
        Self::from_vec(bytes.to_vec())
    }

    fn from_vec(bytes: Vec<u8>) -> Result<Self, InputError> {
        if bytes.is_empty() {
            return Err(InputError::Empty);
        }

        let format =
            image::guess_format(&bytes).map_err(|e| InputError::Undecodable(e.to_string()))?;
        let mime_type = match format {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
            other => return Err(InputError::UnsupportedFormat(format!("{other:?}"))),
        };

        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| InputError::Undecodable(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(InputError::Degenerate);
        }

        if width <= MAX_WIDTH {
            return Ok(Self {
                bytes,
                mime_type,
                width,
                height,
            });
        }

        let scaled_height =
            (u64::from(height) * u64::from(MAX_WIDTH) / u64::from(width)).max(1) as u32;
        let resized = decoded.resize_exact(MAX_WIDTH, scaled_height, FilterType::Triangle);
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

        let mut out = Cursor::new(Vec::new());
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
            .map_err(|e| InputError::Undecodable(e.to_string()))?;

        tracing::debug!(
            original_width = width,
            original_height = height,
            width = MAX_WIDTH,
            height = scaled_height,
            "Downscaled upload"
        );

        Ok(Self {
            bytes: out.into_inner(),
            mime_type: "image/jpeg",
            width: MAX_WIDTH,
            height: scaled_height,
        })
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn as_classifier_image(&self) -> ClassifierImage<'_> {
        ClassifierImage {
            bytes: &self.bytes,
            mime_type: self.mime_type,
        }
    }
}
