//! Image decoding for incoming requests.
//!
//! The codec turns transport payloads (raw bytes or base64 text) into an
//! [`RgbImage`]: row-major, 8-bit RGB, alpha dropped, grayscale expanded. It is
//! pure and holds no shared state.

use crate::core::config::CodecConfig;
use crate::core::errors::{ServeError, ServeResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use image::error::ImageError;
use image::{ImageReader, Limits, RgbImage};
use std::io::Cursor;

/// Decodes image payloads within configured size limits.
#[derive(Debug, Clone, Copy)]
pub struct ImageCodec {
    max_encoded_bytes: usize,
    max_dimension: u32,
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::from_config(&CodecConfig::default())
    }
}

impl ImageCodec {
    pub fn new(max_encoded_bytes: usize, max_dimension: u32) -> Self {
        Self {
            max_encoded_bytes,
            max_dimension,
        }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.max_encoded_bytes, config.max_dimension)
    }

    /// Decodes an encoded image (PNG, JPEG, ...) into RGB pixels.
    ///
    /// # Errors
    ///
    /// Returns a decode error when the payload is empty, larger than the
    /// configured limit, not a recognized format, truncated or corrupt, or
    /// when the decoded image exceeds the maximum dimension.
    pub fn decode(&self, bytes: &[u8]) -> ServeResult<RgbImage> {
        if bytes.is_empty() {
            return Err(ServeError::decode("image payload is empty"));
        }
        if bytes.len() > self.max_encoded_bytes {
            return Err(ServeError::decode(format!(
                "image payload is {} bytes, limit is {}",
                bytes.len(),
                self.max_encoded_bytes
            )));
        }

        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ServeError::decode_with_source("could not read image payload", e))?;
        if reader.format().is_none() {
            return Err(ServeError::decode("unrecognized image format"));
        }

        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);
        reader.limits(limits);

        let image = reader.decode().map_err(|e| match e {
            ImageError::Limits(_) => ServeError::decode_with_source(
                format!("image exceeds {} pixels per side", self.max_dimension),
                e,
            ),
            ImageError::Unsupported(_) => {
                ServeError::decode_with_source("unsupported image encoding", e)
            }
            other => ServeError::decode_with_source("image data is corrupt or truncated", other),
        })?;

        if image.width() == 0 || image.height() == 0 {
            return Err(ServeError::decode("image has zero width or height"));
        }
        Ok(image.to_rgb8())
    }

    /// Decodes a base64 payload, optionally wrapped in a `data:` URL.
    pub fn decode_base64(&self, text: &str) -> ServeResult<RgbImage> {
        let payload = strip_data_url(text.trim());
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(ServeError::decode("image payload is empty"));
        }
        if compact.len() / 4 * 3 > self.max_encoded_bytes.saturating_add(3) {
            return Err(ServeError::decode(format!(
                "image payload exceeds {} bytes",
                self.max_encoded_bytes
            )));
        }

        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| ServeError::decode_with_source("image payload is not valid base64", e))?;
        self.decode(&bytes)
    }
}

fn strip_data_url(text: &str) -> &str {
    if text.starts_with("data:")
        && let Some((_, data)) = text.split_once(";base64,")
    {
        return data;
    }
    text
}
