//! One check-in attempt.
//!
//! A [`CheckinSession`] owns every stateful piece of an attempt: the camera
//! controller, the gate set, the coordinator, the threshold service, the
//! movement tracker and the phase machine. Nothing is shared between
//! sessions, so two attempts can run side by side without interfering.
//!
//! The session is driven from outside by explicit calls: [`tick`] on a
//! timer, [`handle_orientation`] and [`record_geolocation`] from sensors,
//! and [`check_in`] when the user presses the shutter.
//!
//! [`tick`]: CheckinSession::tick
//! [`handle_orientation`]: CheckinSession::handle_orientation
//! [`record_geolocation`]: CheckinSession::record_geolocation
//! [`check_in`]: CheckinSession::check_in

use super::phase::{CheckinPhase, InvalidTransition, PhaseListener, PhaseMachine};
use super::schedule::SamplingSchedule;
use super::sink::{CheckinRecord, CheckinSink, PhotoVerifier, SinkError, Verdict};
use crate::capture::{
    Camera, CameraController, CameraError, CapturedPhoto, FileConfig, FlowConfig, SamplingConfig,
};
use crate::coordinator::{GateCoordinator, IntelligentGateStatus};
use crate::gates::GateSet;
use crate::location::{
    AdaptiveThresholds, CarpetDatabase, GeoReading, LocationContext, LocationThresholdService,
    MovementTracker,
};
use crate::metrics::MetricsRegistry;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors surfaced to the caller of a session operation.
#[derive(Debug, Error)]
pub enum CheckinError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error("verification failed: {0}")]
    Verification(SinkError),

    #[error("check-in commit failed: {0}")]
    Commit(SinkError),

    #[error("capture is locked until every gate passes")]
    GatesNotPassed,

    #[error("no captured photo is waiting for verification")]
    NoPendingPhoto,
}

/// Result of verifying and committing a captured photo.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckinOutcome {
    CheckedIn(CheckinRecord),
    NotCarpet { reason: String },
    /// The camera stopped while the photo was pending. The session is
    /// reset to CAMERA_STARTING.
    Discarded,
}

/// Constructed context for one check-in attempt.
pub struct CheckinSession<C: Camera, V: PhotoVerifier, S: CheckinSink> {
    controller: CameraController<C>,
    gates: GateSet,
    coordinator: GateCoordinator,
    thresholds: LocationThresholdService,
    movement: MovementTracker,
    machine: PhaseMachine,
    verifier: V,
    sink: S,
    sampling: SamplingConfig,
    flow: FlowConfig,
    schedule: Option<SamplingSchedule>,
    context: LocationContext,
    status: Option<IntelligentGateStatus>,
    pending_photo: Option<CapturedPhoto>,
    retry_at: Option<Instant>,
    metrics: Option<MetricsRegistry>,
}

impl<C: Camera, V: PhotoVerifier, S: CheckinSink> CheckinSession<C, V, S> {
    pub fn new(
        camera: C,
        config: &FileConfig,
        database: CarpetDatabase,
        verifier: V,
        sink: S,
    ) -> Self {
        let mut gates = GateSet::new(&config.thresholds, &config.sampling);
        gates.set_dynamic_weighting(config.flags.dynamic_weighting());

        Self {
            controller: CameraController::new(camera, config.capture.clone()),
            gates,
            coordinator: GateCoordinator::new(config.flags.clone()),
            thresholds: LocationThresholdService::new(database, config.thresholds.clone()),
            movement: MovementTracker::new(),
            machine: PhaseMachine::new(),
            verifier,
            sink,
            sampling: config.sampling.clone(),
            flow: config.flow.clone(),
            schedule: None,
            context: LocationContext::default(),
            status: None,
            pending_photo: None,
            retry_at: None,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsRegistry) -> Self {
        metrics.record_transition(self.machine.phase());
        self.metrics = Some(metrics);
        self
    }

    pub fn add_listener(&mut self, listener: impl PhaseListener + 'static) {
        self.machine.add_listener(listener);
    }

    /// Starts the camera and moves to WAITING_FOR_GATES.
    ///
    /// A start failure, timeout included, is returned to the caller and
    /// recorded as the error message. The session stays in
    /// CAMERA_STARTING and is not retried.
    pub async fn start_camera(&mut self) -> Result<(), CheckinError> {
        if self.machine.phase() != CheckinPhase::CameraStarting {
            return Err(InvalidTransition {
                from: self.machine.phase(),
                to: CheckinPhase::WaitingForGates,
            }
            .into());
        }

        if let Err(e) = self.controller.start().await {
            self.machine.set_error_message(e.to_string());
            if let Some(metrics) = &self.metrics {
                metrics.record_sensor_error();
            }
            return Err(e.into());
        }

        self.gates.reset_frames();
        self.status = None;
        self.schedule = Some(SamplingSchedule::new(&self.sampling, Instant::now()));
        self.transition(CheckinPhase::WaitingForGates)?;
        Ok(())
    }

    /// Releases the camera. Work in flight against the old stream is
    /// discarded when it completes.
    pub fn stop_camera(&mut self) {
        self.controller.stop();
        self.schedule = None;
        self.retry_at = None;
    }

    /// Updates location context and, when enabled, the gate thresholds.
    pub fn update_location(&mut self, context: LocationContext) -> &AdaptiveThresholds {
        if self.coordinator.flags().location_optimization() {
            self.thresholds.update_location(&context);
            self.gates.apply_thresholds(self.thresholds.thresholds());
        }
        self.context = context;
        self.thresholds.thresholds()
    }

    /// Feeds a geolocation fix into movement tracking and location context.
    pub fn record_geolocation(&mut self, reading: GeoReading) {
        self.movement.record(reading);
        let context = LocationContext {
            lat: Some(reading.point.lat),
            lng: Some(reading.point.lng),
            ..self.context.clone()
        };
        self.update_location(context);
    }

    pub fn handle_orientation(&mut self, beta: f64, at: Instant) {
        self.gates.handle_orientation(beta, at);
    }

    /// Advances timers. Returns a fresh status when the gate tick fired.
    pub fn tick(&mut self, now: Instant) -> Option<IntelligentGateStatus> {
        self.gates.poll_orientation(now);

        if self.machine.phase() == CheckinPhase::NotCarpetDetected
            && self.retry_at.is_some_and(|at| now >= at)
        {
            self.retry_at = None;
            if let Err(e) = self.transition(CheckinPhase::WaitingForGates) {
                tracing::warn!(error = %e, "Retry countdown could not resume");
            }
        }

        if self.machine.phase() != CheckinPhase::WaitingForGates {
            return None;
        }
        let ticks = self.schedule.as_mut()?.poll(now);

        if ticks.metrics {
            if let Some(frame) = self.live_frame() {
                self.gates.update_metrics(&frame, now);
            }
            self.finish_ticks(true, false);
        }

        if !ticks.gate {
            return None;
        }
        if self.coordinator.flags().enhanced_analysis() {
            if let Some(frame) = self.live_frame() {
                self.gates.analyze_enhanced(&frame);
            }
        }
        let status = self
            .coordinator
            .evaluate(&self.gates.snapshot(), self.thresholds.thresholds());
        if let Some(metrics) = &self.metrics {
            metrics.record_gates(&self.gates.results());
            metrics.record_status(&status);
        }
        self.status = Some(status.clone());
        self.finish_ticks(false, true);
        Some(status)
    }

    fn finish_ticks(&mut self, metrics: bool, gate: bool) {
        if let Some(schedule) = self.schedule.as_mut() {
            if metrics {
                schedule.finish_metrics();
            }
            if gate {
                schedule.finish_gate();
            }
        }
    }

    fn live_frame(&mut self) -> Option<crate::capture::Frame> {
        match self.controller.frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(error = %e, "Frame unavailable");
                self.machine.set_error_message(e.to_string());
                if let Some(metrics) = &self.metrics {
                    metrics.record_sensor_error();
                }
                None
            }
        }
    }

    /// True when the user may take the photo.
    pub fn can_capture(&self) -> bool {
        self.machine.phase() == CheckinPhase::WaitingForGates
            && self.coordinator.all_gates_passed(&self.gates.snapshot())
    }

    /// Freezes the current frame and moves to PHOTO_CAPTURED.
    pub fn capture(&mut self) -> Result<&CapturedPhoto, CheckinError> {
        if !self.can_capture() {
            return Err(CheckinError::GatesNotPassed);
        }
        let photo = self.controller.capture_photo()?;
        self.transition(CheckinPhase::PhotoCaptured)?;
        tracing::info!(
            fingerprint = photo.fingerprint(),
            bytes = photo.bytes().len(),
            epoch = photo.epoch(),
            "Photo captured"
        );
        Ok(self.pending_photo.insert(photo))
    }

    /// Verifies the captured photo and commits the check-in.
    pub fn verify(&mut self, now: Instant) -> Result<CheckinOutcome, CheckinError> {
        let photo = self.pending_photo.take().ok_or(CheckinError::NoPendingPhoto)?;
        if !self.controller.is_current(photo.epoch()) {
            tracing::info!(epoch = photo.epoch(), "Discarding photo from a stopped stream");
            self.reset();
            return Ok(CheckinOutcome::Discarded);
        }

        self.transition(CheckinPhase::LlmThinking)?;
        let verdict = self.verifier.verify(&photo, self.status.as_ref());

        match verdict {
            Ok(Verdict::Carpet) => self.commit(&photo),
            Ok(Verdict::NotCarpet { reason }) => {
                self.reject(reason.clone(), now)?;
                Ok(CheckinOutcome::NotCarpet { reason })
            }
            Err(e) => {
                self.reject(e.to_string(), now)?;
                Err(CheckinError::Verification(e))
            }
        }
    }

    /// Captures, verifies and commits in one step.
    pub fn check_in(&mut self, now: Instant) -> Result<CheckinOutcome, CheckinError> {
        self.capture()?;
        self.verify(now)
    }

    fn reject(&mut self, reason: String, now: Instant) -> Result<(), CheckinError> {
        self.machine.reject(reason.as_str())?;
        self.record_phase();
        self.retry_at = Some(now + Duration::from_secs(self.flow.not_carpet_retry_secs));
        if let Some(metrics) = &self.metrics {
            metrics.record_rejection();
        }
        tracing::info!(reason = %reason, retry_secs = self.flow.not_carpet_retry_secs, "Not a carpet");
        Ok(())
    }

    fn commit(&mut self, photo: &CapturedPhoto) -> Result<CheckinOutcome, CheckinError> {
        self.transition(CheckinPhase::CheckInProcessing)?;
        let record = CheckinRecord::new(self.context.pub_id.clone(), photo, self.status.as_ref());

        match self.sink.commit(&record, photo) {
            Ok(()) => {
                self.transition(CheckinPhase::SuccessModal)?;
                if let Some(metrics) = &self.metrics {
                    metrics.record_checkin();
                }
                tracing::info!(
                    pub_id = ?record.pub_id,
                    fingerprint = %record.photo_fingerprint,
                    "Check-in committed"
                );
                Ok(CheckinOutcome::CheckedIn(record))
            }
            Err(e) => {
                self.transition(CheckinPhase::WaitingForGates)?;
                self.machine.set_error_message(e.to_string());
                tracing::warn!(error = %e, "Check-in commit failed");
                Err(CheckinError::Commit(e))
            }
        }
    }

    /// Leaves a finished, rejected or waiting attempt and stops the camera
    /// so the next attempt starts from CAMERA_STARTING.
    pub fn restart(&mut self) -> Result<(), CheckinError> {
        self.transition(CheckinPhase::CameraStarting)?;
        self.stop_camera();
        self.pending_photo = None;
        self.status = None;
        Ok(())
    }

    /// Unconditionally returns to CAMERA_STARTING.
    pub fn reset(&mut self) {
        self.stop_camera();
        self.machine.reset();
        self.record_phase();
        self.gates.reset_frames();
        self.pending_photo = None;
        self.status = None;
    }

    fn transition(&mut self, to: CheckinPhase) -> Result<(), InvalidTransition> {
        self.machine.transition_to(to)?;
        self.record_phase();
        Ok(())
    }

    fn record_phase(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_transition(self.machine.phase());
        }
    }

    pub fn phase(&self) -> CheckinPhase {
        self.machine.phase()
    }

    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn error_message(&self) -> Option<&str> {
        self.machine.error_message()
    }

    pub fn status(&self) -> Option<&IntelligentGateStatus> {
        self.status.as_ref()
    }

    pub fn gates(&self) -> &GateSet {
        &self.gates
    }

    pub fn thresholds(&self) -> &AdaptiveThresholds {
        self.thresholds.thresholds()
    }

    pub fn movement(&self) -> &MovementTracker {
        &self.movement
    }

    pub fn controller(&self) -> &CameraController<C> {
        &self.controller
    }

    pub fn camera_mut(&mut self) -> &mut C {
        self.controller.camera_mut()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// When the not-carpet countdown ends, if one is running.
    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        let schedule = self.schedule.as_ref().map(|s| s.next_deadline());
        match (schedule, self.retry_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockCamera, MockScene};
    use crate::checkin::sink::{GateStatusVerifier, MemorySink, ScriptedVerifier};
    use crate::coordinator::CarpetConfidence;
    use chrono::Utc;

    type Session<V> = CheckinSession<MockCamera, V, MemorySink>;

    fn config() -> FileConfig {
        let mut config = FileConfig::default();
        config.capture.width = 96;
        config.capture.height = 72;
        config
    }

    fn session<V: PhotoVerifier>(scene: MockScene, verifier: V) -> Session<V> {
        CheckinSession::new(
            MockCamera::with_scene(scene, 21),
            &config(),
            CarpetDatabase::seeded(),
            verifier,
            MemorySink::new(),
        )
    }

    /// Runs 1.2 s of ticks with the phone held at 30 degrees.
    fn settle<V: PhotoVerifier>(session: &mut Session<V>, t0: Instant) -> Option<IntelligentGateStatus> {
        session.handle_orientation(30.0, t0);
        let mut last = None;
        for step in 0..=12u64 {
            if let Some(status) = session.tick(t0 + Duration::from_millis(100 * step)) {
                last = Some(status);
            }
        }
        last
    }

    #[tokio::test(start_paused = true)]
    async fn test_carpet_check_in() {
        let mut session = session(MockScene::Carpet, GateStatusVerifier::default());
        session.update_location(LocationContext::for_pub("the_crosse_keys_london"));
        session.start_camera().await.unwrap();
        assert_eq!(session.phase(), CheckinPhase::WaitingForGates);

        let t0 = Instant::now();
        let status = settle(&mut session, t0).unwrap();
        assert!(status.all_gates_passed, "{:?}", status.failed_gates);
        assert_eq!(status.carpet_confidence, CarpetConfidence::Certain);
        assert!(session.can_capture());

        let outcome = session.check_in(t0 + Duration::from_secs(2)).unwrap();
        let CheckinOutcome::CheckedIn(record) = outcome else {
            panic!("expected a check-in, got {outcome:?}");
        };
        assert_eq!(record.pub_id.as_deref(), Some("the_crosse_keys_london"));
        assert_eq!(session.phase(), CheckinPhase::SuccessModal);
        assert_eq!(session.sink().records().len(), 1);

        session.restart().unwrap();
        assert_eq!(session.phase(), CheckinPhase::CameraStarting);
        assert!(!session.controller().is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_locks_capture() {
        let mut session = session(MockScene::PlainWall, GateStatusVerifier::default());
        session.start_camera().await.unwrap();

        let status = settle(&mut session, Instant::now()).unwrap();
        assert!(!status.all_gates_passed);
        assert!(matches!(session.capture(), Err(CheckinError::GatesNotPassed)));
        assert_eq!(session.phase(), CheckinPhase::WaitingForGates);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_carpet_countdown() {
        let verifier = ScriptedVerifier::new([Ok(Verdict::NotCarpet {
            reason: "That's a doormat".into(),
        })]);
        let mut session = session(MockScene::Carpet, verifier);
        session.start_camera().await.unwrap();
        let t0 = Instant::now();
        settle(&mut session, t0);

        let rejected_at = t0 + Duration::from_secs(2);
        let outcome = session.check_in(rejected_at).unwrap();
        assert!(matches!(outcome, CheckinOutcome::NotCarpet { .. }));
        assert_eq!(session.phase(), CheckinPhase::NotCarpetDetected);
        assert_eq!(session.error_message(), Some("That's a doormat"));

        session.tick(rejected_at + Duration::from_millis(2900));
        assert_eq!(session.phase(), CheckinPhase::NotCarpetDetected);

        session.tick(rejected_at + Duration::from_secs(3));
        assert_eq!(session.phase(), CheckinPhase::WaitingForGates);
        assert_eq!(session.error_message(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_failure_returns_to_waiting() {
        let mut session = session(MockScene::Carpet, ScriptedVerifier::always(Verdict::Carpet));
        session.start_camera().await.unwrap();
        let t0 = Instant::now();
        settle(&mut session, t0);

        let mut failing = MemorySink::new();
        failing.fail_next(SinkError::Unavailable("offline".into()));
        session.sink = failing;

        let err = session.check_in(t0 + Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, CheckinError::Commit(_)));
        assert_eq!(session.phase(), CheckinPhase::WaitingForGates);
        assert!(session.error_message().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_photo_discarded() {
        let mut session = session(MockScene::Carpet, ScriptedVerifier::always(Verdict::Carpet));
        session.start_camera().await.unwrap();
        let t0 = Instant::now();
        settle(&mut session, t0);

        session.capture().unwrap();
        session.stop_camera();

        let outcome = session.verify(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(outcome, CheckinOutcome::Discarded);
        assert_eq!(session.phase(), CheckinPhase::CameraStarting);
        assert_eq!(session.verifier().calls(), 0);
        assert!(session.sink().records().is_empty());

        session.start_camera().await.unwrap();
        assert_eq!(session.phase(), CheckinPhase::WaitingForGates);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gps_fixes_while_ticking_unlock_capture() {
        let mut session = session(MockScene::Carpet, GateStatusVerifier::default());
        session.start_camera().await.unwrap();
        let t0 = Instant::now();
        let wall = Utc::now();

        let mut unlocked_at = None;
        for step in 0..=40u64 {
            let now = t0 + Duration::from_millis(100 * step);
            if step % 3 == 0 {
                session.record_geolocation(GeoReading::new(
                    55.9533,
                    -3.1883,
                    wall + chrono::Duration::milliseconds(100 * step as i64),
                ));
                session.handle_orientation(25.0, now);
            }
            session.tick(now);
            if unlocked_at.is_none() && session.can_capture() {
                unlocked_at = Some(step);
            }
        }

        assert!(unlocked_at.is_some());
        assert!(!session.movement().is_moving());
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_timeout_is_fatal_for_attempt() {
        let mut session: Session<GateStatusVerifier> = CheckinSession::new(
            MockCamera::new().never_ready(),
            &config(),
            CarpetDatabase::seeded(),
            GateStatusVerifier::default(),
            MemorySink::new(),
        );

        let err = session.start_camera().await.unwrap_err();
        assert!(matches!(
            err,
            CheckinError::Camera(CameraError::StartTimeout { timeout_ms: 5000 })
        ));
        assert_eq!(session.phase(), CheckinPhase::CameraStarting);
        assert!(session.error_message().is_some());
        assert!(session.tick(Instant::now()).is_none());
    }

    #[test]
    fn test_location_updates_thresholds() {
        let mut session = session(MockScene::Carpet, GateStatusVerifier::default());
        let t0 = Utc::now();

        session.record_geolocation(GeoReading::new(51.6575, -0.3975, t0));
        assert_eq!(session.thresholds().sharpness, 21.0);
        assert!(!session.movement().is_moving());

        session.update_location(LocationContext::for_pub("moon_under_water_watford"));
        assert_eq!(session.thresholds().sharpness, 29.0);
    }

    #[test]
    fn test_location_flag_off_keeps_defaults() {
        let mut config = config();
        config
            .flags
            .set(crate::coordinator::LOCATION_OPTIMIZATION, false);
        let mut session: Session<GateStatusVerifier> = CheckinSession::new(
            MockCamera::new(),
            &config,
            CarpetDatabase::seeded(),
            GateStatusVerifier::default(),
            MemorySink::new(),
        );

        session.update_location(LocationContext::for_pub("moon_under_water_watford"));
        assert_eq!(session.thresholds().sharpness, 20.0);
    }
}
