//! Signal gates.
//!
//! Each gate holds the last raw measurement for one signal and a threshold;
//! `passed` is derived from those on every read, never stored. Composite
//! gates additionally keep the feature bundle of the last analyzed frame.
//!
//! Analysis failures never escape a gate: they are logged and the gate
//! keeps its previous value.

mod color_variance;
mod motion;
mod orientation;
mod pattern;
mod scalar;
mod set;

pub use color_variance::{majority_vote, ColorChecks, ColorVarianceGate};
pub use motion::{MotionStabilityGate, StabilityTracker};
pub use orientation::{Debouncer, OrientationGate};
pub use pattern::{PatternRecognitionGate, PatternWeights};
pub use scalar::ThresholdGate;
pub use set::{GateSet, GateSnapshot};

use serde::Serialize;
use std::fmt;

/// Identifies a gate and its feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GateKind {
    Orientation,
    Stability,
    Sharpness,
    Contrast,
    Texture,
    Edges,
    ColorVariance,
    PatternRecognition,
}

impl GateKind {
    /// Gates that always take part in the fused status.
    pub const BASIC: [GateKind; 6] = [
        GateKind::Orientation,
        GateKind::Stability,
        GateKind::Sharpness,
        GateKind::Contrast,
        GateKind::Texture,
        GateKind::Edges,
    ];

    /// Gates that only take part when enhanced analysis is on.
    pub const ENHANCED: [GateKind; 2] = [GateKind::ColorVariance, GateKind::PatternRecognition];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateKind::Orientation => "orientation",
            GateKind::Stability => "stability",
            GateKind::Sharpness => "sharpness",
            GateKind::Contrast => "contrast",
            GateKind::Texture => "texture",
            GateKind::Edges => "edges",
            GateKind::ColorVariance => "colorVariance",
            GateKind::PatternRecognition => "patternRecognition",
        }
    }

    /// Feature flag path that enables this gate.
    pub fn flag_key(&self) -> String {
        format!("checkinGates.{}", self.as_str())
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract every gate honours.
pub trait Gate {
    fn kind(&self) -> GateKind;

    /// Last measured raw value, if any.
    fn current_value(&self) -> Option<f64>;

    /// Cutoff used for pass/fail. Range gates report their upper bound.
    fn threshold(&self) -> f64;

    /// Closed pass range, for gates that test a range instead of a cutoff.
    fn range(&self) -> Option<(f64, f64)> {
        None
    }

    /// Pure function of the current value, threshold and captured features.
    fn passed(&self) -> bool;

    fn result(&self) -> GateResult {
        GateResult {
            name: self.kind().as_str(),
            current_value: self.current_value(),
            threshold: self.threshold(),
            range: self.range(),
            passed: self.passed(),
        }
    }
}

/// Point-in-time view of one gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateResult {
    pub name: &'static str,
    pub current_value: Option<f64>,
    pub threshold: f64,
    pub range: Option<(f64, f64)>,
    pub passed: bool,
}
