//! Frame type representing a captured video frame with metadata.

use std::time::Instant;

/// Bytes per pixel for the packed RGB8 layout used throughout the pipeline.
pub const RGB_CHANNELS: usize = 3;

/// A single frame from the video source.
///
/// Pixels are packed RGB8, row-major, no padding. Gates only ever borrow
/// frames; the frame frozen at capture time is cloned into the photo.
#[derive(Clone)]
pub struct Frame {
    /// Packed RGB8 pixel data.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Capture timestamp for motion and scheduling.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame stamped with the current instant.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self::with_timestamp(pixels, width, height, sequence, Instant::now())
    }

    /// Creates a frame with an explicit timestamp.
    pub fn with_timestamp(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        sequence: u64,
        timestamp: Instant,
    ) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp,
            sequence,
        }
    }

    /// Builds a frame where every pixel has the same colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let count = (width as usize) * (height as usize);
        let pixels = rgb.iter().copied().cycle().take(count * RGB_CHANNELS).collect();
        Self::new(pixels, width, height, sequence)
    }

    /// Returns the packed RGB8 pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixel_count() > 0 && self.pixels.len() == self.pixel_count() * RGB_CHANNELS
    }

    /// Iterates over pixels as `[r, g, b]` triples.
    pub fn rgb_pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.pixels
            .chunks_exact(RGB_CHANNELS)
            .map(|p| [p[0], p[1], p[2]])
    }

    /// Converts to Rec.601 luma, one byte per pixel.
    pub fn luma(&self) -> Vec<u8> {
        self.rgb_pixels()
            .map(|[r, g, b]| {
                (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
            })
            .collect()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
