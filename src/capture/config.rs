//! Camera capture and application configuration.
//!
//! The rear camera is requested at a fixed resolution; the start timeout
//! bounds how long the flow waits for the stream to deliver frames.

use crate::analysis::ThresholdConfig;
use crate::coordinator::FeatureFlags;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which physical camera to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointed at the floor.
    #[default]
    Environment,
    /// Front camera.
    User,
}

/// Configuration for camera capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Camera device index or identifier.
    pub device_id: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Requested camera.
    pub facing: FacingMode,
    /// Hard limit for the stream to become ready, in milliseconds.
    pub start_timeout_ms: u64,
    /// JPEG quality for captured photos (1-100).
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: 30,
            facing: FacingMode::Environment,
            start_timeout_ms: 5000,
            jpeg_quality: 80,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Returns the start timeout as a duration.
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 3 || self.height < 3 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.start_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::InvalidQuality(self.jpeg_quality));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions (minimum 3x3)")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("camera start timeout must be non-zero")]
    InvalidTimeout,
    #[error("invalid JPEG quality {0} (must be 1-100)")]
    InvalidQuality(u8),
    #[error("invalid orientation range [{min}, {max}]")]
    InvalidOrientationRange { min: f64, max: f64 },
    #[error("sampling intervals must be non-zero")]
    InvalidSampling,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub flags: FeatureFlags,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Timer intervals for frame analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Interval for scalar frame metrics.
    pub metrics_interval_ms: u64,
    /// Interval for composite gate analysis and fused status.
    pub gate_interval_ms: u64,
    /// Quiet period before an orientation event is applied.
    pub orientation_debounce_ms: u64,
    /// Time motion must stay below threshold before the device counts as stable.
    pub stability_dwell_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            metrics_interval_ms: 200,
            gate_interval_ms: 1000,
            orientation_debounce_ms: 50,
            stability_dwell_ms: 1000,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics_interval_ms == 0 || self.gate_interval_ms == 0 {
            return Err(ConfigError::InvalidSampling);
        }
        Ok(())
    }
}

/// User-facing flow timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Seconds the "not carpet" screen counts down before retrying.
    pub not_carpet_retry_secs: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            not_carpet_retry_secs: 3,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { metrics_port: 9090 }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.thresholds.validate()?;
        self.sampling.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CaptureConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.start_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [capture]
            device_id = 1
            width = 320
            height = 240
            fps = 15
            facing = "user"
            start_timeout_ms = 2000
            jpeg_quality = 90

            [flags]
            "checkinGates.sharpness" = false
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.width, 320);
        assert_eq!(config.capture.facing, FacingMode::User);
        assert_eq!(config.sampling.metrics_interval_ms, 200);
        assert_eq!(config.flow.not_carpet_retry_secs, 3);
        assert!(!config.flags.is_enabled("checkinGates.sharpness"));
        assert!(config.flags.is_enabled("checkinGates.contrast"));
    }

    #[test]
    fn test_bad_quality_rejected() {
        let result = FileConfig::from_toml(
            r#"
            [capture]
            device_id = 0
            width = 640
            height = 480
            fps = 30
            facing = "environment"
            start_timeout_ms = 5000
            jpeg_quality = 0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidQuality(0))));
    }
}
