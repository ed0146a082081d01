//! Scalar frame signals for the basic gates.
//!
//! All measurements run on Rec.601 luma. Values are scaled so the static
//! and adaptive thresholds can be compared directly against them.

use super::AnalysisError;
use crate::capture::Frame;

/// Sobel magnitude above which a pixel counts as an edge.
pub const EDGE_MAGNITUDE_THRESHOLD: f32 = 100.0;

/// Block size for local texture measurement.
const TEXTURE_BLOCK: usize = 8;

/// Scalar measurements for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStatistics {
    /// Square root of the Laplacian variance, clamped to [0, 100].
    pub sharpness: f64,
    /// Standard deviation of luma.
    pub contrast: f64,
    /// Percentage of interior pixels on an edge.
    pub edge_density: f64,
    /// Mean luma standard deviation over 8x8 blocks.
    pub texture_complexity: f64,
    /// Mean absolute luma difference to the previous frame.
    pub motion_level: f64,
}

/// Computes [`FrameStatistics`], remembering the previous frame for motion.
#[derive(Debug, Default)]
pub struct FrameAnalyzer {
    previous_luma: Option<Vec<u8>>,
}

impl FrameAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzes a frame. Invalid frames leave the motion baseline untouched.
    pub fn analyze(&mut self, frame: &Frame) -> Result<FrameStatistics, AnalysisError> {
        validate(frame)?;
        let w = frame.width() as usize;
        let h = frame.height() as usize;
        let luma = frame.luma();

        let motion_level = match &self.previous_luma {
            Some(prev) if prev.len() == luma.len() => mean_abs_difference(prev, &luma),
            _ => 0.0,
        };

        let stats = FrameStatistics {
            sharpness: sharpness(&luma, w, h),
            contrast: std_dev(&luma),
            edge_density: edge_density(&luma, w, h),
            texture_complexity: texture_complexity(&luma, w, h),
            motion_level,
        };

        tracing::trace!(
            sequence = frame.sequence(),
            sharpness = stats.sharpness,
            contrast = stats.contrast,
            edges = stats.edge_density,
            texture = stats.texture_complexity,
            motion = stats.motion_level,
            "Frame statistics"
        );

        self.previous_luma = Some(luma);
        Ok(stats)
    }

    /// Forgets the motion baseline (e.g. after the camera restarts).
    pub fn reset(&mut self) {
        self.previous_luma = None;
    }
}

/// Checks a frame is analyzable.
pub fn validate(frame: &Frame) -> Result<(), AnalysisError> {
    if frame.width() < 3 || frame.height() < 3 {
        return Err(AnalysisError::TooSmall {
            width: frame.width(),
            height: frame.height(),
        });
    }
    if !frame.is_valid() {
        return Err(AnalysisError::InvalidFrame {
            expected: frame.pixel_count() * crate::capture::RGB_CHANNELS,
            actual: frame.pixels().len(),
        });
    }
    Ok(())
}

fn mean_and_variance(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut n = 0.0;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for v in values {
        n += 1.0;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let mean = sum / n;
    (mean, (sum_sq / n - mean * mean).max(0.0))
}

/// Standard deviation of byte values.
pub fn std_dev(data: &[u8]) -> f64 {
    mean_and_variance(data.iter().map(|&b| b as f64)).1.sqrt()
}

fn mean_abs_difference(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let total: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (x as i16 - y as i16).unsigned_abs() as u64)
        .sum();
    total as f64 / a.len() as f64
}

/// Focus measure from the 4-neighbour Laplacian.
pub fn sharpness(luma: &[u8], w: usize, h: usize) -> f64 {
    let px = |x: usize, y: usize| luma[y * w + x] as f64;
    let responses = (1..h - 1).flat_map(|y| {
        (1..w - 1).map(move |x| {
            4.0 * px(x, y) - px(x - 1, y) - px(x + 1, y) - px(x, y - 1) - px(x, y + 1)
        })
    });
    let (_, variance) = mean_and_variance(responses);
    variance.sqrt().min(100.0)
}

/// Sobel gradient magnitude per pixel; border pixels are zero.
pub fn sobel_magnitude(luma: &[u8], w: usize, h: usize) -> Vec<f32> {
    let mut magnitude = vec![0.0f32; luma.len()];
    let gx = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
    let gy = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

    for y in 1..(h - 1) {
        for x in 1..(w - 1) {
            let mut sum_x = 0.0f32;
            let mut sum_y = 0.0f32;
            for ky in 0..3 {
                for kx in 0..3 {
                    let value = luma[(y + ky - 1) * w + (x + kx - 1)] as f32;
                    sum_x += value * gx[ky * 3 + kx];
                    sum_y += value * gy[ky * 3 + kx];
                }
            }
            magnitude[y * w + x] = (sum_x * sum_x + sum_y * sum_y).sqrt();
        }
    }

    magnitude
}

/// Percentage of interior pixels whose Sobel magnitude exceeds the edge cutoff.
pub fn edge_density(luma: &[u8], w: usize, h: usize) -> f64 {
    let interior = (w - 2) * (h - 2);
    if interior == 0 {
        return 0.0;
    }
    let magnitude = sobel_magnitude(luma, w, h);
    let edges = magnitude
        .iter()
        .filter(|&&m| m > EDGE_MAGNITUDE_THRESHOLD)
        .count();
    edges as f64 * 100.0 / interior as f64
}

/// Mean of per-block standard deviations.
pub fn texture_complexity(luma: &[u8], w: usize, h: usize) -> f64 {
    let block = TEXTURE_BLOCK.min(w).min(h);
    let blocks_x = w / block;
    let blocks_y = h / block;
    let mut total = 0.0;

    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let values = (0..block).flat_map(|dy| {
                let row = (by * block + dy) * w + bx * block;
                luma[row..row + block].iter().map(|&v| v as f64)
            });
            total += mean_and_variance(values).1.sqrt();
        }
    }

    total / (blocks_x * blocks_y) as f64
}
