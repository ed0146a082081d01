//! Frozen frames handed downstream as encoded photos.

use super::{CameraError, Frame};
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;

/// A captured frame encoded as JPEG.
///
/// This is what crosses into persistence and scoring; the raw frame is
/// dropped once encoded.
#[derive(Clone)]
pub struct CapturedPhoto {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
    sequence: u64,
    /// Camera epoch the frame was taken in.
    epoch: u64,
    fingerprint: String,
    captured_at: DateTime<Utc>,
}

impl CapturedPhoto {
    /// Encodes a frame at the given JPEG quality.
    pub fn encode(frame: &Frame, quality: u8, epoch: u64) -> Result<Self, CameraError> {
        if !frame.is_valid() {
            return Err(CameraError::Encode(format!(
                "pixel buffer does not match {}x{}",
                frame.width(),
                frame.height()
            )));
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
            .encode(frame.pixels(), frame.width(), frame.height(), ColorType::Rgb8)
            .map_err(|e| CameraError::Encode(e.to_string()))?;

        let fingerprint = blake3::hash(&jpeg).to_hex().to_string();

        tracing::debug!(
            bytes = jpeg.len(),
            sequence = frame.sequence(),
            epoch,
            "Encoded captured photo"
        );

        Ok(Self {
            jpeg,
            width: frame.width(),
            height: frame.height(),
            sequence: frame.sequence(),
            epoch,
            fingerprint,
            captured_at: Utc::now(),
        })
    }

    /// Returns the encoded JPEG bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// BLAKE3 hex digest of the encoded bytes.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// MIME type of the encoded blob.
    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }
}

impl std::fmt::Debug for CapturedPhoto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedPhoto")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("epoch", &self.epoch)
            .field("jpeg_bytes", &self.jpeg.len())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}
