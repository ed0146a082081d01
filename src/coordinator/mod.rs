//! Gate fusion.
//!
//! The coordinator turns the booleans of a [`GateSet`](crate::gates::GateSet)
//! into one verdict: a confidence class, a 0-100 score and the strict
//! all-gates-passed bit that unlocks capture.

pub mod flags;
mod status;

pub use flags::{FeatureFlags, DYNAMIC_WEIGHTING, ENHANCED_ANALYSIS, LOCATION_OPTIMIZATION};
pub use status::{
    CarpetConfidence, GateCoordinator, IntelligenceLevel, IntelligentGateStatus,
    LocationOptimization, BASIC_RATIO_WEIGHT, ENHANCED_RATIO_WEIGHT, LOCATION_RATIO_BONUS,
};
