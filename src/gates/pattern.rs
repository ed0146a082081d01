//! Pattern recognition gate.
//!
//! Blends texture feature scores with a weight table picked by the detected
//! pattern type. A geometric carpet is judged mostly on contrast and edges,
//! a plain one mostly on colour complexity and repetition.

use super::{Gate, GateKind};
use crate::analysis::{PatternType, TextureFeatures};
use crate::capture::Frame;

/// Weights for combining texture feature scores. Each table sums to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternWeights {
    pub contrast: f64,
    pub edges: f64,
    pub repetition: f64,
    pub complexity: f64,
}

impl PatternWeights {
    pub fn for_pattern(pattern: PatternType) -> Self {
        let (contrast, edges, repetition, complexity) = match pattern {
            PatternType::Geometric => (0.4, 0.3, 0.2, 0.1),
            PatternType::Ornamental => (0.2, 0.3, 0.2, 0.3),
            PatternType::Mixed => (0.25, 0.25, 0.25, 0.25),
            PatternType::Plain => (0.1, 0.2, 0.3, 0.4),
        };
        Self {
            contrast,
            edges,
            repetition,
            complexity,
        }
    }

    /// Weighted sum of the feature scores.
    pub fn combine(&self, features: &TextureFeatures) -> f64 {
        features.contrast * self.contrast
            + features.edge_density * self.edges
            + features.repetition_score * self.repetition
            + features.color_complexity * self.complexity
    }
}

/// Composite gate over [`TextureFeatures`].
#[derive(Debug, Clone)]
pub struct PatternRecognitionGate {
    features: Option<TextureFeatures>,
    threshold: f64,
    dynamic_weighting: bool,
}

impl PatternRecognitionGate {
    pub fn new(threshold: f64) -> Self {
        Self {
            features: None,
            threshold,
            dynamic_weighting: true,
        }
    }

    /// When disabled, the equal-weight table is used for every pattern.
    pub fn set_dynamic_weighting(&mut self, enabled: bool) {
        self.dynamic_weighting = enabled;
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    /// Extracts features from a frame. Failures are logged and the last
    /// features are kept.
    pub fn analyze(&mut self, frame: &Frame) -> bool {
        match TextureFeatures::extract(frame) {
            Ok(features) => self.apply(features),
            Err(e) => {
                tracing::warn!(
                    gate = %GateKind::PatternRecognition,
                    error = %e,
                    "Pattern analysis failed, keeping last result"
                );
                self.passed()
            }
        }
    }

    /// Stores an already extracted feature bundle.
    pub fn apply(&mut self, features: TextureFeatures) -> bool {
        self.features = Some(features);
        let passed = self.passed();
        tracing::debug!(
            score = ?self.score(),
            pattern = ?self.detected_pattern(),
            passed,
            "Pattern recognition updated"
        );
        passed
    }

    pub fn weights(&self) -> Option<PatternWeights> {
        self.features.as_ref().map(|f| {
            if self.dynamic_weighting {
                PatternWeights::for_pattern(f.pattern_type)
            } else {
                PatternWeights::for_pattern(PatternType::Mixed)
            }
        })
    }

    /// Combined score of the last features.
    pub fn score(&self) -> Option<f64> {
        let weights = self.weights()?;
        self.features.as_ref().map(|f| weights.combine(f))
    }

    pub fn features(&self) -> Option<&TextureFeatures> {
        self.features.as_ref()
    }

    pub fn detected_pattern(&self) -> Option<PatternType> {
        self.features.as_ref().map(|f| f.pattern_type)
    }
}

impl Gate for PatternRecognitionGate {
    fn kind(&self) -> GateKind {
        GateKind::PatternRecognition
    }

    fn current_value(&self) -> Option<f64> {
        self.score()
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn passed(&self) -> bool {
        self.score().is_some_and(|score| score > self.threshold)
    }
}
