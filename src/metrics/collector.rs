//! Metrics collection and registry.

use crate::checkin::CheckinPhase;
use crate::coordinator::IntelligentGateStatus;
use crate::gates::GateResult;
use prometheus::{
    Encoder, Gauge, GaugeVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for the check-in pipeline.
///
/// Cloning shares the underlying collectors.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    // Gate metrics
    gate_value: GaugeVec,
    gate_threshold: GaugeVec,
    gate_passed: GaugeVec,

    // Fused status metrics
    confidence_score: Gauge,
    combined_ratio: Gauge,
    all_gates_passed: IntGauge,
    threshold_confidence: Gauge,

    // Flow metrics
    phase: IntGauge,
    transitions_total: IntCounterVec,
    checkins_total: IntCounter,
    rejections_total: IntCounter,
    sensor_errors_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all check-in metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let gate_value = GaugeVec::new(
            Opts::new("carpet_checkin_gate_value", "Last raw value measured by a gate"),
            &["gate"],
        )?;
        let gate_threshold = GaugeVec::new(
            Opts::new("carpet_checkin_gate_threshold", "Threshold a gate is judged against"),
            &["gate"],
        )?;
        let gate_passed = GaugeVec::new(
            Opts::new("carpet_checkin_gate_passed", "Gate pass state (1=passed, 0=failed)"),
            &["gate"],
        )?;

        let confidence_score = Gauge::new(
            "carpet_checkin_confidence_score",
            "Fused confidence score (0-100)",
        )?;
        let combined_ratio = Gauge::new(
            "carpet_checkin_combined_ratio",
            "Weighted gate pass ratio behind the confidence class",
        )?;
        let all_gates_passed = IntGauge::new(
            "carpet_checkin_all_gates_passed",
            "Whether capture is unlocked (1=yes, 0=no)",
        )?;
        let threshold_confidence = Gauge::new(
            "carpet_checkin_threshold_confidence",
            "Confidence of the active adaptive thresholds",
        )?;

        let phase = IntGauge::new(
            "carpet_checkin_phase",
            "Current check-in phase (0=CAMERA_STARTING .. 6=SUCCESS_MODAL)",
        )?;
        let transitions_total = IntCounterVec::new(
            Opts::new("carpet_checkin_transitions_total", "Accepted phase transitions"),
            &["to"],
        )?;
        let checkins_total = IntCounter::new(
            "carpet_checkin_checkins_total",
            "Check-ins committed downstream",
        )?;
        let rejections_total = IntCounter::new(
            "carpet_checkin_rejections_total",
            "Photos rejected as not carpet",
        )?;
        let sensor_errors_total = IntCounter::new(
            "carpet_checkin_sensor_errors_total",
            "Camera and frame acquisition errors",
        )?;

        registry.register(Box::new(gate_value.clone()))?;
        registry.register(Box::new(gate_threshold.clone()))?;
        registry.register(Box::new(gate_passed.clone()))?;
        registry.register(Box::new(confidence_score.clone()))?;
        registry.register(Box::new(combined_ratio.clone()))?;
        registry.register(Box::new(all_gates_passed.clone()))?;
        registry.register(Box::new(threshold_confidence.clone()))?;
        registry.register(Box::new(phase.clone()))?;
        registry.register(Box::new(transitions_total.clone()))?;
        registry.register(Box::new(checkins_total.clone()))?;
        registry.register(Box::new(rejections_total.clone()))?;
        registry.register(Box::new(sensor_errors_total.clone()))?;

        Ok(Self {
            registry,
            gate_value,
            gate_threshold,
            gate_passed,
            confidence_score,
            combined_ratio,
            all_gates_passed,
            threshold_confidence,
            phase,
            transitions_total,
            checkins_total,
            rejections_total,
            sensor_errors_total,
        })
    }

    /// Records the per-gate view. Gates without a value keep their last one.
    pub fn record_gates(&self, results: &[GateResult]) {
        for result in results {
            if let Some(value) = result.current_value {
                self.gate_value.with_label_values(&[result.name]).set(value);
            }
            self.gate_threshold
                .with_label_values(&[result.name])
                .set(result.threshold);
            self.gate_passed
                .with_label_values(&[result.name])
                .set(if result.passed { 1.0 } else { 0.0 });
        }
    }

    pub fn record_status(&self, status: &IntelligentGateStatus) {
        self.confidence_score.set(status.confidence_score);
        self.combined_ratio.set(status.combined_ratio);
        self.all_gates_passed
            .set(if status.all_gates_passed { 1 } else { 0 });
        self.threshold_confidence.set(status.location.confidence);
    }

    pub fn record_transition(&self, to: CheckinPhase) {
        self.phase.set(to.index() as i64);
        self.transitions_total.with_label_values(&[to.as_str()]).inc();
    }

    pub fn record_checkin(&self) {
        self.checkins_total.inc();
    }

    pub fn record_rejection(&self) {
        self.rejections_total.inc();
    }

    pub fn record_sensor_error(&self) {
        self.sensor_errors_total.inc();
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("checkins", &self.checkins_total.get())
            .field("rejections", &self.rejections_total.get())
            .finish()
    }
}
