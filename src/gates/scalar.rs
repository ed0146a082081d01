//! Single-cutoff gates for sharpness, contrast, edge density and texture.

use super::{Gate, GateKind};

/// Passes when the last value is strictly above the threshold.
#[derive(Debug, Clone)]
pub struct ThresholdGate {
    kind: GateKind,
    value: Option<f64>,
    threshold: f64,
}

impl ThresholdGate {
    pub fn new(kind: GateKind, threshold: f64) -> Self {
        Self {
            kind,
            value: None,
            threshold,
        }
    }

    /// Stores a new measurement and returns the resulting pass state.
    pub fn update(&mut self, value: f64) -> bool {
        self.value = Some(value);
        self.passed()
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    /// Drops the measurement; the gate fails until the next update.
    pub fn clear(&mut self) {
        self.value = None;
    }
}

impl Gate for ThresholdGate {
    fn kind(&self) -> GateKind {
        self.kind
    }

    fn current_value(&self) -> Option<f64> {
        self.value
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn passed(&self) -> bool {
        self.value.is_some_and(|v| v > self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_gate_fails() {
        let gate = ThresholdGate::new(GateKind::Sharpness, 20.0);
        assert!(!gate.passed());
        assert_eq!(gate.current_value(), None);
    }

    #[test]
    fn test_strictly_above() {
        let mut gate = ThresholdGate::new(GateKind::Contrast, 30.0);
        assert!(!gate.update(30.0));
        assert!(gate.update(30.5));
        assert!(!gate.update(12.0));
    }

    #[test]
    fn test_threshold_change_rederives_pass() {
        let mut gate = ThresholdGate::new(GateKind::Edges, 15.0);
        gate.update(20.0);
        assert!(gate.passed());

        gate.set_threshold(36.0);
        assert!(!gate.passed());

        let result = gate.result();
        assert_eq!(result.name, "edges");
        assert_eq!(result.current_value, Some(20.0));
        assert_eq!(result.threshold, 36.0);
    }
}
