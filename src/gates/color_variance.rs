//! Colour variance gate: a 3-of-4 majority vote over colour checks.

use super::{Gate, GateKind};
use crate::analysis::ColorProfile;
use crate::capture::Frame;

const MIN_CONTRAST_RATIO: f64 = 0.3;
const MIN_SATURATION: f64 = 0.2;
const MIN_DOMINANT_COLOURS: usize = 3;
const REQUIRED_VOTES: usize = 3;

/// The four independent colour checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChecks {
    pub variance: bool,
    pub contrast: bool,
    pub saturation: bool,
    pub color_count: bool,
}

impl ColorChecks {
    pub fn evaluate(profile: &ColorProfile, variance_threshold: f64) -> Self {
        Self {
            variance: profile.variance > variance_threshold,
            contrast: profile.contrast_ratio > MIN_CONTRAST_RATIO,
            saturation: profile.saturation_level > MIN_SATURATION,
            color_count: profile.dominant_colors.len() >= MIN_DOMINANT_COLOURS,
        }
    }

    pub fn as_array(&self) -> [bool; 4] {
        [self.variance, self.contrast, self.saturation, self.color_count]
    }

    pub fn votes(&self) -> usize {
        self.as_array().iter().filter(|&&check| check).count()
    }
}

/// True when at least three of the four checks hold.
pub fn majority_vote(checks: [bool; 4]) -> bool {
    checks.iter().filter(|&&check| check).count() >= REQUIRED_VOTES
}

/// Composite gate over [`ColorProfile`].
#[derive(Debug, Clone)]
pub struct ColorVarianceGate {
    profile: Option<ColorProfile>,
    variance_threshold: f64,
}

impl ColorVarianceGate {
    pub fn new(variance_threshold: f64) -> Self {
        Self {
            profile: None,
            variance_threshold,
        }
    }

    /// Extracts a colour profile. Failures are logged and the last profile
    /// is kept.
    pub fn analyze(&mut self, frame: &Frame) -> bool {
        match ColorProfile::extract(frame) {
            Ok(profile) => self.apply(profile),
            Err(e) => {
                tracing::warn!(
                    gate = %GateKind::ColorVariance,
                    error = %e,
                    "Colour analysis failed, keeping last result"
                );
                self.passed()
            }
        }
    }

    pub fn apply(&mut self, profile: ColorProfile) -> bool {
        self.profile = Some(profile);
        let passed = self.passed();
        tracing::debug!(votes = ?self.checks().map(|c| c.votes()), passed, "Colour variance updated");
        passed
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.variance_threshold = threshold;
    }

    pub fn checks(&self) -> Option<ColorChecks> {
        self.profile
            .as_ref()
            .map(|p| ColorChecks::evaluate(p, self.variance_threshold))
    }

    pub fn profile(&self) -> Option<&ColorProfile> {
        self.profile.as_ref()
    }
}

impl Gate for ColorVarianceGate {
    fn kind(&self) -> GateKind {
        GateKind::ColorVariance
    }

    fn current_value(&self) -> Option<f64> {
        self.profile.as_ref().map(|p| p.variance)
    }

    fn threshold(&self) -> f64 {
        self.variance_threshold
    }

    fn passed(&self) -> bool {
        self.checks().is_some_and(|c| majority_vote(c.as_array()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn profile(variance: f64, contrast: f64, saturation: f64, colours: usize) -> ColorProfile {
        ColorProfile {
            dominant_colors: (0..colours).map(|i| format!("#0000{i:02X}")).collect(),
            variance,
            saturation_level: saturation,
            contrast_ratio: contrast,
            processing_time: Duration::ZERO,
        }
    }

    #[test]
    fn test_all_sixteen_combinations() {
        for mask in 0u8..16 {
            let checks = [mask & 1 != 0, mask & 2 != 0, mask & 4 != 0, mask & 8 != 0];
            let expected = mask.count_ones() >= 3;
            assert_eq!(majority_vote(checks), expected, "mask {mask:04b}");

            let p = profile(
                if checks[0] { 500.0 } else { 100.0 },
                if checks[1] { 0.5 } else { 0.1 },
                if checks[2] { 0.5 } else { 0.1 },
                if checks[3] { 4 } else { 1 },
            );
            let mut gate = ColorVarianceGate::new(400.0);
            assert_eq!(gate.apply(p), expected, "mask {mask:04b}");
        }
    }

    #[test]
    fn test_boundaries_are_strict() {
        let mut gate = ColorVarianceGate::new(400.0);
        gate.apply(profile(400.0, 0.3, 0.2, 3));

        let checks = gate.checks().unwrap();
        assert_eq!(checks.as_array(), [false, false, false, true]);
        assert!(!gate.passed());
    }

    #[test]
    fn test_unanalyzed_gate_fails() {
        assert!(!ColorVarianceGate::new(0.0).passed());
    }
}
