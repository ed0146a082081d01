//! Motion stability gate.
//!
//! The gate needs both a low instantaneous motion level and a stable
//! device. Stability comes from [`StabilityTracker`], which requires the
//! motion level to stay below threshold for a continuous dwell time.

use super::{Gate, GateKind};
use std::time::{Duration, Instant};

/// Tracks how long motion has stayed calm.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    dwell: Duration,
    calm_since: Option<Instant>,
}

impl StabilityTracker {
    pub fn new(dwell: Duration) -> Self {
        Self {
            dwell,
            calm_since: None,
        }
    }

    /// Records one sample and returns whether the device is stable.
    pub fn observe(&mut self, calm: bool, at: Instant) -> bool {
        if !calm {
            self.calm_since = None;
            return false;
        }
        let since = *self.calm_since.get_or_insert(at);
        at.saturating_duration_since(since) >= self.dwell
    }

    pub fn reset(&mut self) {
        self.calm_since = None;
    }
}

/// Passes when motion is below threshold and the device is stable.
#[derive(Debug, Clone)]
pub struct MotionStabilityGate {
    level: Option<f64>,
    threshold: f64,
    stable: bool,
    tracker: StabilityTracker,
}

impl MotionStabilityGate {
    pub fn new(threshold: f64, dwell: Duration) -> Self {
        Self {
            level: None,
            threshold,
            stable: false,
            tracker: StabilityTracker::new(dwell),
        }
    }

    /// Stores a motion sample and derives stability from the dwell tracker.
    pub fn update(&mut self, level: f64, at: Instant) -> bool {
        self.level = Some(level);
        self.stable = self.tracker.observe(level < self.threshold, at);
        self.passed()
    }

    /// Stores a motion sample with stability computed elsewhere.
    pub fn update_with_stability(&mut self, level: f64, is_stable: bool) -> bool {
        self.level = Some(level);
        self.stable = is_stable;
        self.passed()
    }

    /// Replaces the motion threshold. Only a stricter threshold restarts
    /// the dwell, since calm samples stay calm under a looser one.
    pub fn set_threshold(&mut self, threshold: f64) {
        let stricter = threshold < self.threshold;
        self.threshold = threshold;
        if stricter {
            self.tracker.reset();
            self.stable = false;
        }
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }

    pub fn reset(&mut self) {
        self.level = None;
        self.stable = false;
        self.tracker.reset();
    }
}

impl Gate for MotionStabilityGate {
    fn kind(&self) -> GateKind {
        GateKind::Stability
    }

    fn current_value(&self) -> Option<f64> {
        self.level
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn passed(&self) -> bool {
        self.stable && self.level.is_some_and(|level| level < self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_dwell_time() {
        let mut gate = MotionStabilityGate::new(30.0, Duration::from_millis(1000));
        let t0 = Instant::now();

        assert!(!gate.update(5.0, t0));
        assert!(!gate.update(5.0, t0 + Duration::from_millis(600)));
        assert!(gate.update(5.0, t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_shake_resets_dwell() {
        let mut gate = MotionStabilityGate::new(30.0, Duration::from_millis(400));
        let t0 = Instant::now();

        gate.update(5.0, t0);
        assert!(gate.update(5.0, t0 + Duration::from_millis(400)));

        assert!(!gate.update(80.0, t0 + Duration::from_millis(600)));
        assert!(!gate.update(5.0, t0 + Duration::from_millis(800)));
        assert!(gate.update(5.0, t0 + Duration::from_millis(1200)));
    }

    #[test]
    fn test_same_threshold_keeps_dwell() {
        let mut gate = MotionStabilityGate::new(30.0, Duration::from_millis(1000));
        let t0 = Instant::now();

        gate.update(5.0, t0);
        gate.set_threshold(30.0);
        assert!(!gate.update(5.0, t0 + Duration::from_millis(800)));
        gate.set_threshold(30.0);
        assert!(gate.update(5.0, t0 + Duration::from_millis(1000)));
        gate.set_threshold(30.0);
        assert!(gate.passed());

        gate.set_threshold(40.0);
        assert!(gate.passed());
    }

    #[test]
    fn test_stricter_threshold_restarts_dwell() {
        let mut gate = MotionStabilityGate::new(30.0, Duration::from_millis(400));
        let t0 = Instant::now();

        gate.update(5.0, t0);
        assert!(gate.update(5.0, t0 + Duration::from_millis(400)));

        gate.set_threshold(20.0);
        assert!(!gate.passed());
        assert!(!gate.update(5.0, t0 + Duration::from_millis(600)));
        assert!(gate.update(5.0, t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_external_stability_required() {
        let mut gate = MotionStabilityGate::new(30.0, Duration::ZERO);
        assert!(!gate.update_with_stability(5.0, false));
        assert!(gate.update_with_stability(5.0, true));
        assert!(!gate.update_with_stability(30.0, true));
    }
}
