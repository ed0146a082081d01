//! Camera lifecycle for one check-in attempt.
//!
//! Starting waits for the stream to report frame data, bounded by a hard
//! timeout. Each successful start opens a new epoch; stopping bumps the
//! epoch so results produced against an older stream can be recognised
//! and dropped.

use super::{Camera, CameraError, CaptureConfig, CapturedPhoto, Frame, ReadyState};
use std::time::Duration;

/// How often readiness is polled while starting.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns the video source for a session.
pub struct CameraController<C: Camera> {
    camera: C,
    config: CaptureConfig,
    epoch: u64,
    active: bool,
    last_error: Option<String>,
}

impl<C: Camera> CameraController<C> {
    pub fn new(camera: C, config: CaptureConfig) -> Self {
        Self {
            camera,
            config,
            epoch: 0,
            active: false,
            last_error: None,
        }
    }

    /// Opens the stream and waits until it can deliver frames.
    ///
    /// Fails fast with [`CameraError::StartTimeout`] when the stream is not
    /// ready within the configured timeout. There is no automatic retry.
    pub async fn start(&mut self) -> Result<u64, CameraError> {
        if self.active {
            self.stop();
        }

        let timeout = self.config.start_timeout();
        let outcome = tokio::time::timeout(timeout, self.open_and_wait()).await;

        match outcome {
            Ok(Ok(())) => {
                self.epoch += 1;
                self.active = true;
                self.last_error = None;
                tracing::info!(epoch = self.epoch, "Camera started");
                Ok(self.epoch)
            }
            Ok(Err(e)) => {
                self.camera.close();
                tracing::warn!(error = %e, "Camera start failed");
                self.last_error = Some(e.to_string());
                Err(e)
            }
            Err(_) => {
                self.camera.close();
                let e = CameraError::StartTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                };
                tracing::warn!(error = %e, "Camera start timed out");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn open_and_wait(&mut self) -> Result<(), CameraError> {
        self.camera.open(&self.config)?;
        while self.camera.ready_state() != ReadyState::HaveEnoughData {
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Ok(())
    }

    /// Releases the stream synchronously and invalidates the current epoch.
    pub fn stop(&mut self) {
        if self.active {
            self.camera.close();
            tracing::info!(epoch = self.epoch, "Camera stopped");
        }
        self.active = false;
        self.epoch += 1;
    }

    /// Returns the current live frame.
    pub fn frame(&mut self) -> Result<Frame, CameraError> {
        if !self.active {
            return Err(CameraError::NotInitialized);
        }
        self.camera.capture()
    }

    /// Freezes the current frame and encodes it for downstream use.
    pub fn capture_photo(&mut self) -> Result<CapturedPhoto, CameraError> {
        let frame = self.frame()?;
        CapturedPhoto::encode(&frame, self.config.jpeg_quality, self.epoch)
    }

    /// True when `epoch` still refers to the live stream.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.active && epoch == self.epoch
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Last sensor error message, cleared on a successful start.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }
}
