//! Check-in phase state machine.
//!
//! ```text
//! CAMERA_STARTING     → WAITING_FOR_GATES
//! WAITING_FOR_GATES   → PHOTO_CAPTURED | CAMERA_STARTING
//! PHOTO_CAPTURED      → LLM_THINKING
//! LLM_THINKING        → NOT_CARPET_DETECTED | CHECK_IN_PROCESSING
//! NOT_CARPET_DETECTED → WAITING_FOR_GATES | CAMERA_STARTING
//! CHECK_IN_PROCESSING → SUCCESS_MODAL | WAITING_FOR_GATES
//! SUCCESS_MODAL       → CAMERA_STARTING
//! ```
//!
//! There is no terminal phase. Any transition outside the table is logged
//! and rejected without touching the phase, history or error message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Phase of the user-facing check-in flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckinPhase {
    CameraStarting,
    WaitingForGates,
    PhotoCaptured,
    LlmThinking,
    NotCarpetDetected,
    CheckInProcessing,
    SuccessModal,
}

impl CheckinPhase {
    pub const ALL: [CheckinPhase; 7] = [
        CheckinPhase::CameraStarting,
        CheckinPhase::WaitingForGates,
        CheckinPhase::PhotoCaptured,
        CheckinPhase::LlmThinking,
        CheckinPhase::NotCarpetDetected,
        CheckinPhase::CheckInProcessing,
        CheckinPhase::SuccessModal,
    ];

    /// Phases reachable from this one.
    pub fn allowed_transitions(&self) -> &'static [CheckinPhase] {
        use CheckinPhase::*;
        match self {
            CameraStarting => &[WaitingForGates],
            WaitingForGates => &[PhotoCaptured, CameraStarting],
            PhotoCaptured => &[LlmThinking],
            LlmThinking => &[NotCarpetDetected, CheckInProcessing],
            NotCarpetDetected => &[WaitingForGates, CameraStarting],
            CheckInProcessing => &[SuccessModal, WaitingForGates],
            SuccessModal => &[CameraStarting],
        }
    }

    pub fn can_transition_to(&self, next: CheckinPhase) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckinPhase::CameraStarting => "CAMERA_STARTING",
            CheckinPhase::WaitingForGates => "WAITING_FOR_GATES",
            CheckinPhase::PhotoCaptured => "PHOTO_CAPTURED",
            CheckinPhase::LlmThinking => "LLM_THINKING",
            CheckinPhase::NotCarpetDetected => "NOT_CARPET_DETECTED",
            CheckinPhase::CheckInProcessing => "CHECK_IN_PROCESSING",
            CheckinPhase::SuccessModal => "SUCCESS_MODAL",
        }
    }

    /// Stable numeric code, used for the phase gauge.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }
}

impl fmt::Display for CheckinPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition not present in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid phase transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: CheckinPhase,
    pub to: CheckinPhase,
}

/// History entry: a phase that was left, and when.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseRecord {
    pub phase: CheckinPhase,
    pub left_at: DateTime<Utc>,
}

/// Notified after every accepted transition.
pub trait PhaseListener: Send {
    fn on_transition(&mut self, from: CheckinPhase, to: CheckinPhase);
}

impl<F> PhaseListener for F
where
    F: FnMut(CheckinPhase, CheckinPhase) + Send,
{
    fn on_transition(&mut self, from: CheckinPhase, to: CheckinPhase) {
        self(from, to)
    }
}

/// Phase, history and error message of one check-in attempt.
pub struct PhaseMachine {
    phase: CheckinPhase,
    history: Vec<PhaseRecord>,
    error_message: Option<String>,
    listeners: Vec<Box<dyn PhaseListener>>,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            phase: CheckinPhase::CameraStarting,
            history: Vec::new(),
            error_message: None,
            listeners: Vec::new(),
        }
    }

    pub fn phase(&self) -> CheckinPhase {
        self.phase
    }

    pub fn history(&self) -> &[PhaseRecord] {
        &self.history
    }

    /// Phases visited so far, oldest first.
    pub fn visited(&self) -> impl Iterator<Item = CheckinPhase> + '_ {
        self.history.iter().map(|r| r.phase)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Records a user-facing error without changing phase.
    pub fn set_error_message(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn add_listener(&mut self, listener: impl PhaseListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn can_transition_to(&self, next: CheckinPhase) -> bool {
        self.phase.can_transition_to(next)
    }

    /// Moves to `next` if the table allows it.
    pub fn transition_to(&mut self, next: CheckinPhase) -> Result<(), InvalidTransition> {
        let from = self.phase;
        if !from.can_transition_to(next) {
            tracing::warn!(
                from = %from,
                to = %next,
                allowed = ?from.allowed_transitions(),
                "Rejected phase transition"
            );
            return Err(InvalidTransition { from, to: next });
        }

        self.history.push(PhaseRecord {
            phase: from,
            left_at: Utc::now(),
        });
        self.phase = next;
        if next != CheckinPhase::NotCarpetDetected {
            self.error_message = None;
        }

        tracing::debug!(from = %from, to = %next, "Phase transition");
        for listener in &mut self.listeners {
            listener.on_transition(from, next);
        }
        Ok(())
    }

    /// Enters NOT_CARPET_DETECTED with a message.
    pub fn reject(&mut self, message: impl Into<String>) -> Result<(), InvalidTransition> {
        self.transition_to(CheckinPhase::NotCarpetDetected)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Returns to CAMERA_STARTING regardless of the table, clearing history
    /// and error.
    pub fn reset(&mut self) {
        let from = self.phase;
        self.phase = CheckinPhase::CameraStarting;
        self.history.clear();
        self.error_message = None;
        tracing::debug!(from = %from, "Phase machine reset");
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PhaseMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseMachine")
            .field("phase", &self.phase)
            .field("history", &self.history.len())
            .field("error_message", &self.error_message)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use CheckinPhase::*;

    fn machine_at(path: &[CheckinPhase]) -> PhaseMachine {
        let mut machine = PhaseMachine::new();
        for &phase in path {
            machine.transition_to(phase).unwrap();
        }
        machine
    }

    #[test]
    fn test_starts_at_camera_starting() {
        let machine = PhaseMachine::new();
        assert_eq!(machine.phase(), CameraStarting);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_happy_path_records_previous_phases() {
        let machine = machine_at(&[
            WaitingForGates,
            PhotoCaptured,
            LlmThinking,
            CheckInProcessing,
            SuccessModal,
            CameraStarting,
        ]);

        let visited: Vec<_> = machine.visited().collect();
        assert_eq!(
            visited,
            vec![
                CameraStarting,
                WaitingForGates,
                PhotoCaptured,
                LlmThinking,
                CheckInProcessing,
                SuccessModal
            ]
        );
    }

    #[test]
    fn test_illegal_transition_leaves_state() {
        let mut machine = machine_at(&[WaitingForGates]);
        let before: Vec<_> = machine.history().to_vec();

        let err = machine.transition_to(CheckInProcessing).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: WaitingForGates,
                to: CheckInProcessing
            }
        );
        assert_eq!(machine.phase(), WaitingForGates);
        assert_eq!(machine.history(), before.as_slice());
    }

    #[test]
    fn test_self_transition_rejected() {
        let mut machine = PhaseMachine::new();
        assert!(machine.transition_to(CameraStarting).is_err());
    }

    #[test]
    fn test_error_message_lifecycle() {
        let mut machine = machine_at(&[WaitingForGates, PhotoCaptured, LlmThinking]);
        machine.reject("Looks like a floorboard").unwrap();
        assert_eq!(machine.phase(), NotCarpetDetected);
        assert_eq!(machine.error_message(), Some("Looks like a floorboard"));

        machine.transition_to(WaitingForGates).unwrap();
        assert_eq!(machine.error_message(), None);
    }

    #[test]
    fn test_rejected_transition_keeps_error() {
        let mut machine = PhaseMachine::new();
        machine.set_error_message("Camera permission denied");
        assert!(machine.transition_to(SuccessModal).is_err());
        assert_eq!(machine.error_message(), Some("Camera permission denied"));
    }

    #[test]
    fn test_reset_bypasses_table() {
        let mut machine = machine_at(&[WaitingForGates, PhotoCaptured]);
        machine.set_error_message("stale");
        machine.reset();

        assert_eq!(machine.phase(), CameraStarting);
        assert!(machine.history().is_empty());
        assert_eq!(machine.error_message(), None);
    }

    #[test]
    fn test_listeners_see_accepted_transitions_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut machine = PhaseMachine::new();
        machine.add_listener(move |from: CheckinPhase, to: CheckinPhase| {
            sink.lock().unwrap().push((from, to))
        });

        machine.transition_to(WaitingForGates).unwrap();
        let _ = machine.transition_to(SuccessModal);

        assert_eq!(*seen.lock().unwrap(), vec![(CameraStarting, WaitingForGates)]);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&NotCarpetDetected).unwrap();
        assert_eq!(json, "\"NOT_CARPET_DETECTED\"");
        assert_eq!(LlmThinking.to_string(), "LLM_THINKING");
    }

    #[test]
    fn test_every_phase_has_an_exit() {
        for phase in CheckinPhase::ALL {
            assert!(!phase.allowed_transitions().is_empty(), "{phase}");
        }
    }
}
