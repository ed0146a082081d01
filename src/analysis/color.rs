//! Colour profile extraction for the colour variance gate.

use super::{statistics, AnalysisError};
use crate::capture::Frame;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Number of quantised colour bins (2 bits per channel).
pub const COLOUR_BINS: usize = 64;

/// Share of pixels a bin needs to count as a dominant colour.
const DOMINANT_SHARE: f64 = 0.05;
const MAX_DOMINANT: usize = 6;

/// Colour statistics for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorProfile {
    /// Hex colours of the dominant bins, most populous first.
    pub dominant_colors: Vec<String>,
    /// Mean of the per-channel variances.
    pub variance: f64,
    /// Mean HSV saturation in [0, 1].
    pub saturation_level: f64,
    /// Spread between the 5th and 95th luma percentiles, in [0, 1].
    pub contrast_ratio: f64,
    #[serde(skip)]
    pub processing_time: Duration,
}

impl ColorProfile {
    /// Extracts the colour profile of a frame.
    pub fn extract(frame: &Frame) -> Result<Self, AnalysisError> {
        let started = Instant::now();
        statistics::validate(frame)?;

        let histogram = colour_histogram(frame);
        let total = frame.pixel_count() as f64;

        let mut ranked: Vec<(usize, u32)> = histogram
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, count)| count as f64 / total >= DOMINANT_SHARE)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let dominant_colors = ranked
            .into_iter()
            .take(MAX_DOMINANT)
            .map(|(bin, _)| bin_hex(bin))
            .collect();

        let profile = Self {
            dominant_colors,
            variance: channel_variance(frame),
            saturation_level: mean_saturation(frame),
            contrast_ratio: luma_spread(frame),
            processing_time: started.elapsed(),
        };

        tracing::trace!(
            variance = profile.variance,
            saturation = profile.saturation_level,
            contrast_ratio = profile.contrast_ratio,
            dominant = profile.dominant_colors.len(),
            "Colour profile extracted"
        );

        Ok(profile)
    }
}

/// Bin index for a pixel: top two bits of each channel.
#[inline]
pub fn colour_bin([r, g, b]: [u8; 3]) -> usize {
    ((r >> 6) as usize) << 4 | ((g >> 6) as usize) << 2 | (b >> 6) as usize
}

/// Pixel counts per quantised colour bin.
pub fn colour_histogram(frame: &Frame) -> [u32; COLOUR_BINS] {
    let mut histogram = [0u32; COLOUR_BINS];
    for pixel in frame.rgb_pixels() {
        histogram[colour_bin(pixel)] += 1;
    }
    histogram
}

/// Hex string for the centre of a bin.
fn bin_hex(bin: usize) -> String {
    let centre = |q: usize| ((q & 0b11) << 6) as u8 + 32;
    format!(
        "#{:02X}{:02X}{:02X}",
        centre(bin >> 4),
        centre(bin >> 2),
        centre(bin)
    )
}

fn channel_variance(frame: &Frame) -> f64 {
    let n = frame.pixel_count() as f64;
    let mut sum = [0.0f64; 3];
    let mut sum_sq = [0.0f64; 3];
    for pixel in frame.rgb_pixels() {
        for c in 0..3 {
            let v = pixel[c] as f64;
            sum[c] += v;
            sum_sq[c] += v * v;
        }
    }
    (0..3)
        .map(|c| {
            let mean = sum[c] / n;
            (sum_sq[c] / n - mean * mean).max(0.0)
        })
        .sum::<f64>()
        / 3.0
}

fn mean_saturation(frame: &Frame) -> f64 {
    let total: f64 = frame
        .rgb_pixels()
        .map(|p| {
            let max = *p.iter().max().unwrap_or(&0) as f64;
            let min = *p.iter().min().unwrap_or(&0) as f64;
            if max == 0.0 {
                0.0
            } else {
                (max - min) / max
            }
        })
        .sum();
    total / frame.pixel_count() as f64
}

fn luma_spread(frame: &Frame) -> f64 {
    let mut counts = [0usize; 256];
    for v in frame.luma() {
        counts[v as usize] += 1;
    }
    let n = frame.pixel_count();
    let percentile = |p: f64| {
        let target = ((n as f64) * p).ceil().max(1.0) as usize;
        let mut seen = 0;
        for (value, &count) in counts.iter().enumerate() {
            seen += count;
            if seen >= target {
                return value as f64;
            }
        }
        255.0
    };
    (percentile(0.95) - percentile(0.05)) / 255.0
}
