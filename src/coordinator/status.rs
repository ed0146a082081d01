//! Fused gate status.
//!
//! [`GateCoordinator::evaluate`] is a pure function of the current gate
//! snapshot, the active adaptive thresholds and the feature flags. It keeps
//! no memory between calls, so a gate that failed on one tick is judged
//! afresh on the next.

use super::flags::FeatureFlags;
use crate::gates::{GateKind, GateSnapshot};
use crate::location::{AdaptiveThresholds, CarpetInfo, ThresholdSource};
use serde::Serialize;
use std::fmt;

/// Weight of the basic gates in the combined ratio.
pub const BASIC_RATIO_WEIGHT: f64 = 0.6;
/// Weight of the enhanced gates in the combined ratio.
pub const ENHANCED_RATIO_WEIGHT: f64 = 0.4;
/// Ratio bonus when thresholds are location-optimized.
pub const LOCATION_RATIO_BONUS: f64 = 0.1;

const BASIC_SCORE_WEIGHT: f64 = 60.0;
const ENHANCED_SCORE_WEIGHT: f64 = 25.0;
const OPTIMIZED_SCORE_BONUS: f64 = 10.0;
const UNOPTIMIZED_SCORE_BONUS: f64 = 5.0;
const THRESHOLD_CONFIDENCE_WEIGHT: f64 = 5.0;

/// Categorical carpet verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CarpetConfidence {
    No,
    Possible,
    Likely,
    Certain,
}

impl CarpetConfidence {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.9 {
            CarpetConfidence::Certain
        } else if ratio >= 0.7 {
            CarpetConfidence::Likely
        } else if ratio >= 0.4 {
            CarpetConfidence::Possible
        } else {
            CarpetConfidence::No
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CarpetConfidence::No => "no",
            CarpetConfidence::Possible => "possible",
            CarpetConfidence::Likely => "likely",
            CarpetConfidence::Certain => "certain",
        }
    }
}

impl fmt::Display for CarpetConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of the analysis stack is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntelligenceLevel {
    Basic,
    Enhanced,
    Advanced,
}

impl IntelligenceLevel {
    pub fn from_flags(flags: &FeatureFlags) -> Self {
        let enhanced = flags.enhanced_analysis();
        let location = flags.location_optimization();
        if enhanced && location && flags.dynamic_weighting() {
            IntelligenceLevel::Advanced
        } else if enhanced || location {
            IntelligenceLevel::Enhanced
        } else {
            IntelligenceLevel::Basic
        }
    }
}

/// Provenance of the thresholds the gates were judged against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationOptimization {
    pub is_optimized: bool,
    pub source: ThresholdSource,
    pub confidence: f64,
    pub carpet_info: Option<CarpetInfo>,
}

/// Coordinator output for one recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligentGateStatus {
    /// Gate booleans with disabled gates reported as passed.
    pub gates: GateSnapshot,
    pub enhanced_enabled: bool,
    pub carpet_confidence: CarpetConfidence,
    pub intelligence_level: IntelligenceLevel,
    /// 0 to 100.
    pub confidence_score: f64,
    pub combined_ratio: f64,
    pub failed_gates: Vec<GateKind>,
    pub all_gates_passed: bool,
    pub location: LocationOptimization,
}

/// Fuses gate outputs into one decision.
#[derive(Debug, Clone, Default)]
pub struct GateCoordinator {
    flags: FeatureFlags,
}

impl GateCoordinator {
    pub fn new(flags: FeatureFlags) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    /// Applies per-gate flags: a disabled gate counts as passed.
    pub fn effective(&self, gates: &GateSnapshot) -> GateSnapshot {
        let mut effective = *gates;
        for (kind, passed) in gates.basic().into_iter().chain(gates.enhanced()) {
            effective.set(kind, passed || !self.flags.gate_enabled(kind));
        }
        effective
    }

    /// Strict AND over the gates taking part, flags applied.
    pub fn all_gates_passed(&self, gates: &GateSnapshot) -> bool {
        self.considered(&self.effective(gates))
            .iter()
            .all(|&(_, passed)| passed)
    }

    pub fn evaluate(
        &self,
        gates: &GateSnapshot,
        adaptive: &AdaptiveThresholds,
    ) -> IntelligentGateStatus {
        let effective = self.effective(gates);
        let enhanced_enabled = self.flags.enhanced_analysis();
        let optimized =
            self.flags.location_optimization() && adaptive.is_location_optimized();

        let basic_ratio = pass_ratio(&effective.basic());
        let enhanced_ratio = enhanced_enabled.then(|| pass_ratio(&effective.enhanced()));

        let mut combined_ratio = match enhanced_ratio {
            Some(enhanced) => basic_ratio * BASIC_RATIO_WEIGHT + enhanced * ENHANCED_RATIO_WEIGHT,
            None => basic_ratio,
        };
        if optimized {
            combined_ratio += LOCATION_RATIO_BONUS;
        }
        let combined_ratio = combined_ratio.min(1.0);

        let confidence_score = (basic_ratio * BASIC_SCORE_WEIGHT
            + enhanced_ratio.map_or(0.0, |r| r * ENHANCED_SCORE_WEIGHT)
            + if optimized {
                OPTIMIZED_SCORE_BONUS
            } else {
                UNOPTIMIZED_SCORE_BONUS
            }
            + adaptive.confidence * THRESHOLD_CONFIDENCE_WEIGHT)
            .min(100.0);

        let considered = self.considered(&effective);
        let failed_gates: Vec<GateKind> = considered
            .iter()
            .filter(|&&(_, passed)| !passed)
            .map(|&(kind, _)| kind)
            .collect();

        let status = IntelligentGateStatus {
            gates: effective,
            enhanced_enabled,
            carpet_confidence: CarpetConfidence::from_ratio(combined_ratio),
            intelligence_level: IntelligenceLevel::from_flags(&self.flags),
            confidence_score,
            combined_ratio,
            all_gates_passed: failed_gates.is_empty(),
            failed_gates,
            location: LocationOptimization {
                is_optimized: optimized,
                source: adaptive.source,
                confidence: adaptive.confidence,
                carpet_info: adaptive.carpet_info.clone(),
            },
        };

        tracing::debug!(
            confidence = %status.carpet_confidence,
            score = status.confidence_score,
            ratio = status.combined_ratio,
            failed = status.failed_gates.len(),
            "Gate status recomputed"
        );
        status
    }

    fn considered(&self, effective: &GateSnapshot) -> Vec<(GateKind, bool)> {
        let mut gates = effective.basic().to_vec();
        if self.flags.enhanced_analysis() {
            gates.extend(effective.enhanced());
        }
        gates
    }
}

fn pass_ratio(gates: &[(GateKind, bool)]) -> f64 {
    if gates.is_empty() {
        return 0.0;
    }
    let passed = gates.iter().filter(|&&(_, passed)| passed).count();
    passed as f64 / gates.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ThresholdConfig;
    use crate::coordinator::flags::{DYNAMIC_WEIGHTING, ENHANCED_ANALYSIS, LOCATION_OPTIMIZATION};
    use crate::location::{LocationContext, LocationThresholdService};

    fn defaults() -> AdaptiveThresholds {
        AdaptiveThresholds::from_config(&ThresholdConfig::default())
    }

    fn pub_specific() -> AdaptiveThresholds {
        LocationThresholdService::default()
            .derive(&LocationContext::for_pub("moon_under_water_watford"))
    }

    fn basic_only() -> GateCoordinator {
        GateCoordinator::new(FeatureFlags::new().with(ENHANCED_ANALYSIS, false))
    }

    fn basic_passing() -> GateSnapshot {
        let mut gates = GateSnapshot::default();
        for kind in GateKind::BASIC {
            gates.set(kind, true);
        }
        gates
    }

    #[test]
    fn test_all_basic_passing_is_certain() {
        let coordinator = basic_only();

        let status = coordinator.evaluate(&basic_passing(), &defaults());
        assert_eq!(status.combined_ratio, 1.0);
        assert_eq!(status.carpet_confidence, CarpetConfidence::Certain);
        assert!(status.all_gates_passed);

        let status = coordinator.evaluate(&basic_passing(), &pub_specific());
        assert!(status.location.is_optimized);
        assert_eq!(status.combined_ratio, 1.0);
        assert_eq!(status.carpet_confidence, CarpetConfidence::Certain);
    }

    #[test]
    fn test_score_formula() {
        let coordinator = GateCoordinator::default();
        let mut gates = basic_passing();
        gates.set(GateKind::ColorVariance, true);

        // 60 + 0.5 * 25 + 5 + 0.5 * 5
        let status = coordinator.evaluate(&gates, &defaults());
        assert!((status.confidence_score - 80.0).abs() < 1e-9);
        assert_eq!(status.failed_gates, vec![GateKind::PatternRecognition]);
        assert!(!status.all_gates_passed);

        // 60 + 25 + 10 + 4.5 clamps to 100
        let status = coordinator.evaluate(&GateSnapshot::uniform(true), &pub_specific());
        assert_eq!(status.confidence_score, 99.5);
        let status = coordinator.evaluate(
            &GateSnapshot::uniform(true),
            &AdaptiveThresholds {
                confidence: 1.0,
                ..pub_specific()
            },
        );
        assert_eq!(status.confidence_score, 100.0);
    }

    #[test]
    fn test_combined_ratio_with_enhanced() {
        let coordinator = GateCoordinator::default();
        let mut gates = GateSnapshot::default();
        for kind in [GateKind::Orientation, GateKind::Stability, GateKind::Sharpness] {
            gates.set(kind, true);
        }
        gates.set(GateKind::PatternRecognition, true);

        // 0.5 * 0.6 + 0.5 * 0.4
        let status = coordinator.evaluate(&gates, &defaults());
        assert!((status.combined_ratio - 0.5).abs() < 1e-9);
        assert_eq!(status.carpet_confidence, CarpetConfidence::Possible);

        let status = coordinator.evaluate(&gates, &pub_specific());
        assert!((status.combined_ratio - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_buckets() {
        assert_eq!(CarpetConfidence::from_ratio(0.9), CarpetConfidence::Certain);
        assert_eq!(CarpetConfidence::from_ratio(0.89), CarpetConfidence::Likely);
        assert_eq!(CarpetConfidence::from_ratio(0.7), CarpetConfidence::Likely);
        assert_eq!(CarpetConfidence::from_ratio(0.4), CarpetConfidence::Possible);
        assert_eq!(CarpetConfidence::from_ratio(0.39), CarpetConfidence::No);
    }

    #[test]
    fn test_disabled_gate_counts_as_passed() {
        let coordinator = GateCoordinator::new(
            FeatureFlags::new()
                .with(ENHANCED_ANALYSIS, false)
                .with("checkinGates.orientation", false),
        );
        let mut gates = basic_passing();
        gates.set(GateKind::Orientation, false);

        assert!(coordinator.all_gates_passed(&gates));
        let status = coordinator.evaluate(&gates, &defaults());
        assert!(status.gates.orientation);
        assert!(status.failed_gates.is_empty());
    }

    #[test]
    fn test_enhanced_gates_ignored_when_disabled() {
        assert!(basic_only().all_gates_passed(&basic_passing()));
        assert!(!GateCoordinator::default().all_gates_passed(&basic_passing()));
    }

    #[test]
    fn test_location_flag_off_disables_bonus() {
        let coordinator = GateCoordinator::new(
            FeatureFlags::new()
                .with(ENHANCED_ANALYSIS, false)
                .with(LOCATION_OPTIMIZATION, false),
        );
        let status = coordinator.evaluate(&GateSnapshot::default(), &pub_specific());
        assert!(!status.location.is_optimized);
        assert_eq!(status.combined_ratio, 0.0);
        assert_eq!(status.carpet_confidence, CarpetConfidence::No);
        assert_eq!(status.intelligence_level, IntelligenceLevel::Basic);
    }

    #[test]
    fn test_intelligence_levels() {
        assert_eq!(
            IntelligenceLevel::from_flags(&FeatureFlags::new()),
            IntelligenceLevel::Advanced
        );
        assert_eq!(
            IntelligenceLevel::from_flags(&FeatureFlags::new().with(DYNAMIC_WEIGHTING, false)),
            IntelligenceLevel::Enhanced
        );
        assert_eq!(
            IntelligenceLevel::from_flags(
                &FeatureFlags::new()
                    .with(ENHANCED_ANALYSIS, false)
                    .with(LOCATION_OPTIMIZATION, false)
            ),
            IntelligenceLevel::Basic
        );
    }

    #[test]
    fn test_serialized_shape() {
        let status = basic_only().evaluate(&basic_passing(), &pub_specific());
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["carpetConfidence"], "certain");
        assert_eq!(json["location"]["source"], "pub-specific");
    }
}
