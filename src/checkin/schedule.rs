//! Periodic sampling with skip-not-queue semantics.
//!
//! Each [`Ticker`] fires at most once per period. A tick that comes due while
//! the previous one is still being processed is dropped, and missed periods
//! are never replayed: the ticker re-anchors on the next period boundary.

use crate::capture::SamplingConfig;
use std::time::{Duration, Instant};

/// One periodic timer.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next_due: Instant,
    busy: bool,
    skipped: u64,
}

impl Ticker {
    /// First tick is due at `start`.
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_due: start,
            busy: false,
            skipped: 0,
        }
    }

    /// Returns true when a tick fires and work may begin.
    ///
    /// A firing tick marks the ticker busy until [`Ticker::finish`].
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.advance(now);
        if self.busy {
            self.skipped += 1;
            tracing::debug!(period_ms = self.period.as_millis() as u64, "Tick skipped, previous still running");
            return false;
        }
        self.busy = true;
        true
    }

    pub fn finish(&mut self) {
        self.busy = false;
    }

    fn advance(&mut self, now: Instant) {
        let late = now.saturating_duration_since(self.next_due).as_nanos();
        let periods = late / self.period.as_nanos() + 1;
        let step = self.period.as_nanos().saturating_mul(periods);
        self.next_due += Duration::from_nanos(u64::try_from(step).unwrap_or(u64::MAX));
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Ticks dropped because the previous one had not finished.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

/// Which ticks fired on a poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ticks {
    pub metrics: bool,
    pub gate: bool,
}

impl Ticks {
    pub fn any(&self) -> bool {
        self.metrics || self.gate
    }
}

/// The metrics and gate timers of one session.
#[derive(Debug, Clone)]
pub struct SamplingSchedule {
    metrics: Ticker,
    gate: Ticker,
}

impl SamplingSchedule {
    pub fn new(config: &SamplingConfig, start: Instant) -> Self {
        Self {
            metrics: Ticker::new(Duration::from_millis(config.metrics_interval_ms), start),
            gate: Ticker::new(Duration::from_millis(config.gate_interval_ms), start),
        }
    }

    pub fn poll(&mut self, now: Instant) -> Ticks {
        Ticks {
            metrics: self.metrics.poll(now),
            gate: self.gate.poll(now),
        }
    }

    pub fn finish_metrics(&mut self) {
        self.metrics.finish();
    }

    pub fn finish_gate(&mut self) {
        self.gate.finish();
    }

    /// Earliest instant at which either timer fires.
    pub fn next_deadline(&self) -> Instant {
        self.metrics.next_due().min(self.gate.next_due())
    }

    pub fn metrics(&self) -> &Ticker {
        &self.metrics
    }

    pub fn gate(&self) -> &Ticker {
        &self.gate
    }
}
