//! Static per-gate thresholds.
//!
//! These are the hardcoded defaults used when no location context
//! produces adaptive thresholds.

use crate::capture::ConfigError;
use serde::{Deserialize, Serialize};

/// Static thresholds for every gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum sharpness (Laplacian focus measure).
    pub sharpness: f64,
    /// Minimum luma standard deviation.
    pub contrast: f64,
    /// Minimum edge pixel percentage.
    pub edge_density: f64,
    /// Minimum mean block standard deviation.
    pub texture_complexity: f64,
    /// Maximum motion level.
    pub motion: f64,
    /// Lower bound of the device tilt, degrees.
    pub orientation_min: f64,
    /// Upper bound of the device tilt, degrees.
    pub orientation_max: f64,
    /// Minimum mean channel variance for the colour variance gate.
    pub color_variance: f64,
    /// Minimum weighted score for the pattern recognition gate.
    pub pattern_score: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            sharpness: 20.0,
            contrast: 30.0,
            edge_density: 15.0,
            texture_complexity: 15.0,
            motion: 30.0,
            orientation_min: -5.0,
            orientation_max: 45.0,
            color_variance: 400.0,
            pattern_score: 60.0,
        }
    }
}

impl ThresholdConfig {
    /// Thresholds that almost any frame passes (for testing).
    pub fn permissive() -> Self {
        Self {
            sharpness: 0.0,
            contrast: 0.0,
            edge_density: 0.0,
            texture_complexity: 0.0,
            motion: 255.0,
            orientation_min: -180.0,
            orientation_max: 180.0,
            color_variance: 0.0,
            pattern_score: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orientation_min > self.orientation_max {
            return Err(ConfigError::InvalidOrientationRange {
                min: self.orientation_min,
                max: self.orientation_max,
            });
        }
        Ok(())
    }
}
