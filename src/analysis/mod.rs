//! Per-frame signal extraction.
//!
//! This module turns video frames into the scalar signals and feature
//! bundles the gates judge. Features are computed fresh for every frame
//! and never persisted.

mod color;
mod statistics;
mod texture;
mod threshold;

pub use color::{colour_bin, colour_histogram, ColorProfile, COLOUR_BINS};
pub use statistics::{
    edge_density, sharpness, sobel_magnitude, std_dev, texture_complexity, FrameAnalyzer,
    FrameStatistics, EDGE_MAGNITUDE_THRESHOLD,
};
pub use texture::{classify_pattern, periodicity, PatternType, TextureFeatures};
pub use threshold::ThresholdConfig;

/// Errors raised while extracting features from a frame.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    InvalidFrame { expected: usize, actual: usize },

    #[error("frame {width}x{height} is too small to analyze")]
    TooSmall { width: u32, height: u32 },
}
