//! Video source abstraction for frame capture.
//!
//! The check-in flow only needs "give me the current frame, its
//! dimensions and whether the stream is ready". Real devices live outside
//! this crate; [`MockCamera`] synthesises carpet-like or plain frames for
//! tests and the demonstration binary.

use super::{CaptureConfig, Frame};
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("camera not initialized")]
    NotInitialized,
    #[error("video stream not ready")]
    NotReady,
    #[error("camera did not become ready within {timeout_ms}ms")]
    StartTimeout { timeout_ms: u64 },
    #[error("failed to encode photo: {0}")]
    Encode(String),
}

/// Readiness of the video stream, mirroring media element ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    /// No data yet.
    HaveNothing,
    /// Dimensions known, no frame data.
    HaveMetadata,
    /// Frames can be captured.
    HaveEnoughData,
}

/// Trait for video frame sources.
///
/// This abstraction allows swapping between real camera hardware
/// and mock implementations for testing.
pub trait Camera {
    /// Opens the stream with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Polls the stream's ready state.
    fn ready_state(&mut self) -> ReadyState;

    /// Captures the current frame.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Stops all tracks and releases the stream.
    fn close(&mut self);
}

/// What the mock camera is pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockScene {
    /// Repeating four-colour tile and diamond pattern.
    Carpet,
    /// Near-uniform painted wall.
    PlainWall,
}

const CARPET_PALETTE: [[u8; 3]; 4] = [
    [150, 30, 40],   // burgundy
    [230, 170, 40],  // gold
    [30, 40, 110],   // navy
    [225, 215, 160], // cream
];
const WALL_COLOUR: [u8; 3] = [200, 180, 170];
const TILE: u32 = 6;
const MOTIF: i32 = 12;

/// Mock camera that generates seeded synthetic frames.
#[derive(Debug)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    scene: MockScene,
    rng: ChaCha8Rng,
    sequence: u64,
    /// Horizontal pixel drift applied per frame, simulating hand shake.
    drift_per_frame: u32,
    /// Ready-state polls before the stream reports data; `None` never does.
    ready_after_polls: Option<u32>,
    polls: u32,
    deny_permission: bool,
}

impl MockCamera {
    /// A steady camera pointed at a carpet, ready immediately.
    pub fn new() -> Self {
        Self::with_scene(MockScene::Carpet, 0x5EED)
    }

    pub fn with_scene(scene: MockScene, seed: u64) -> Self {
        Self {
            config: None,
            scene,
            rng: ChaCha8Rng::seed_from_u64(seed),
            sequence: 0,
            drift_per_frame: 0,
            ready_after_polls: Some(0),
            polls: 0,
            deny_permission: false,
        }
    }

    /// Switches the scene without reopening the stream.
    pub fn set_scene(&mut self, scene: MockScene) {
        self.scene = scene;
    }

    /// Shifts the scene by `pixels` every frame.
    pub fn with_drift(mut self, pixels: u32) -> Self {
        self.drift_per_frame = pixels;
        self
    }

    /// Reports ready only after `polls` ready-state checks.
    pub fn ready_after(mut self, polls: u32) -> Self {
        self.ready_after_polls = Some(polls);
        self
    }

    /// Never reports enough data.
    pub fn never_ready(mut self) -> Self {
        self.ready_after_polls = None;
        self
    }

    /// Fails `open` as if the user refused camera access.
    pub fn denying_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    fn scene_colour(&self, x: u32, y: u32) -> [u8; 3] {
        match self.scene {
            MockScene::PlainWall => WALL_COLOUR,
            MockScene::Carpet => {
                let x = x.wrapping_add(self.drift_per_frame.wrapping_mul(self.sequence as u32));
                let dx = (x as i32 % MOTIF) - MOTIF / 2;
                let dy = (y as i32 % MOTIF) - MOTIF / 2;
                if dx.abs() + dy.abs() < 3 {
                    CARPET_PALETTE[1]
                } else {
                    CARPET_PALETTE[((x / TILE + y / TILE) % 4) as usize]
                }
            }
        }
    }

    fn noise_amplitude(&self) -> u32 {
        match self.scene {
            MockScene::Carpet => 12,
            MockScene::PlainWall => 2,
        }
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        if self.deny_permission {
            return Err(CameraError::PermissionDenied);
        }
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        self.polls = 0;
        tracing::info!(scene = ?self.scene, "MockCamera opened with config: {:?}", config);
        Ok(())
    }

    fn ready_state(&mut self) -> ReadyState {
        if self.config.is_none() {
            return ReadyState::HaveNothing;
        }
        self.polls = self.polls.saturating_add(1);
        match self.ready_after_polls {
            Some(needed) if self.polls > needed => ReadyState::HaveEnoughData,
            _ => ReadyState::HaveMetadata,
        }
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;
        let (width, height) = (config.width, config.height);
        let amplitude = self.noise_amplitude();

        let mut pixels = Vec::with_capacity((width * height) as usize * 3);
        for y in 0..height {
            for x in 0..width {
                let base = self.scene_colour(x, y);
                for channel in base {
                    let noise = (self.rng.next_u32() % (2 * amplitude + 1)) as i16
                        - amplitude as i16;
                    pixels.push((channel as i16 + noise).clamp(0, 255) as u8);
                }
            }
        }

        self.sequence += 1;
        Ok(Frame::new(pixels, width, height, self.sequence))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        self.config = None;
        tracing::info!("MockCamera closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        let config = CaptureConfig::with_dimensions(64, 48);

        assert!(!camera.is_open());

        camera.open(&config).unwrap();
        assert!(camera.is_open());
        assert_eq!(camera.ready_state(), ReadyState::HaveEnoughData);

        let frame = camera.capture().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = camera.capture().unwrap();
        assert_eq!(frame2.sequence(), 2);

        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(
            camera.capture(),
            Err(CameraError::NotInitialized)
        ));
    }

    #[test]
    fn test_ready_after_polls() {
        let mut camera = MockCamera::new().ready_after(2);
        camera.open(&CaptureConfig::with_dimensions(32, 32)).unwrap();

        assert_eq!(camera.ready_state(), ReadyState::HaveMetadata);
        assert_eq!(camera.ready_state(), ReadyState::HaveMetadata);
        assert_eq!(camera.ready_state(), ReadyState::HaveEnoughData);
    }

    #[test]
    fn test_permission_denied() {
        let mut camera = MockCamera::new().denying_permission();
        assert_eq!(
            camera.open(&CaptureConfig::default()),
            Err(CameraError::PermissionDenied)
        );
        assert!(!camera.is_open());
    }

    #[test]
    fn test_same_seed_same_frames() {
        let config = CaptureConfig::with_dimensions(16, 16);
        let mut a = MockCamera::with_scene(MockScene::Carpet, 42);
        let mut b = MockCamera::with_scene(MockScene::Carpet, 42);
        a.open(&config).unwrap();
        b.open(&config).unwrap();

        assert_eq!(a.capture().unwrap().pixels(), b.capture().unwrap().pixels());
    }
}
