//! Device tilt gate.

use super::{Gate, GateKind};
use std::time::{Duration, Instant};

/// Trailing-edge debouncer: a value is released once no newer value has
/// arrived for the configured delay.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T: Copy> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Records an event, replacing any value still waiting.
    pub fn push(&mut self, value: T, at: Instant) {
        self.pending = Some((value, at));
    }

    /// Releases the pending value if it has been quiet long enough.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((value, at)) if now.saturating_duration_since(at) >= self.delay => {
                self.pending = None;
                Some(value)
            }
            _ => None,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Passes while the beta tilt angle lies in a closed range.
#[derive(Debug, Clone)]
pub struct OrientationGate {
    beta: Option<f64>,
    min: f64,
    max: f64,
    debouncer: Debouncer<f64>,
}

impl OrientationGate {
    pub fn new(min: f64, max: f64, debounce: Duration) -> Self {
        Self {
            beta: None,
            min,
            max,
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Queues a raw device-orientation event.
    pub fn handle_event(&mut self, beta: f64, at: Instant) {
        if beta.is_finite() {
            self.debouncer.push(beta, at);
        }
    }

    /// Applies the debounced angle if one is due. Returns true if applied.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.debouncer.poll(now) {
            Some(beta) => {
                self.update(beta);
                true
            }
            None => false,
        }
    }

    /// Stores an angle directly, rounded to the nearest degree with halves
    /// going up, so -5.5 rounds to -5.
    pub fn update(&mut self, beta: f64) -> bool {
        let rounded = (beta + 0.5).floor();
        self.beta = Some(rounded);
        tracing::trace!(beta = rounded, "Orientation updated");
        self.passed()
    }

    pub fn set_range(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
    }
}

impl Gate for OrientationGate {
    fn kind(&self) -> GateKind {
        GateKind::Orientation
    }

    fn current_value(&self) -> Option<f64> {
        self.beta
    }

    fn threshold(&self) -> f64 {
        self.max
    }

    fn range(&self) -> Option<(f64, f64)> {
        Some((self.min, self.max))
    }

    fn passed(&self) -> bool {
        self.beta
            .is_some_and(|beta| beta >= self.min && beta <= self.max)
    }
}
