//! Camera input and frame handling.
//!
//! This module provides the video source abstraction, the camera lifecycle
//! for a check-in attempt, and the frozen photo handed downstream.

mod camera;
mod config;
mod controller;
mod frame;
mod photo;

pub use camera::{Camera, CameraError, MockCamera, MockScene, ReadyState};
pub use config::{
    CaptureConfig, ConfigError, FacingMode, FileConfig, FlowConfig, OutputConfig, SamplingConfig,
};
pub use controller::CameraController;
pub use frame::{Frame, RGB_CHANNELS};
pub use photo::CapturedPhoto;
