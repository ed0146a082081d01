//! Feature-flag lookup keyed by string path.

use crate::gates::GateKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flag that adds the composite gates to the fused status.
pub const ENHANCED_ANALYSIS: &str = "checkinGates.enhancedAnalysis";
/// Flag that lets location context adapt thresholds.
pub const LOCATION_OPTIMIZATION: &str = "checkinGates.locationOptimization";
/// Flag that picks pattern weights by detected pattern type.
pub const DYNAMIC_WEIGHTING: &str = "checkinGates.dynamicWeighting";

/// Map of flag path to enabled state.
///
/// A path that is not present counts as enabled. A disabled gate is
/// reported as passed by the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureFlags {
    flags: BTreeMap<String, bool>,
}

impl FeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FeatureFlags::set`].
    pub fn with(mut self, path: impl Into<String>, enabled: bool) -> Self {
        self.set(path, enabled);
        self
    }

    pub fn set(&mut self, path: impl Into<String>, enabled: bool) {
        self.flags.insert(path.into(), enabled);
    }

    pub fn is_enabled(&self, path: &str) -> bool {
        self.flags.get(path).copied().unwrap_or(true)
    }

    pub fn gate_enabled(&self, kind: GateKind) -> bool {
        self.is_enabled(&kind.flag_key())
    }

    pub fn enhanced_analysis(&self) -> bool {
        self.is_enabled(ENHANCED_ANALYSIS)
    }

    pub fn location_optimization(&self) -> bool {
        self.is_enabled(LOCATION_OPTIMIZATION)
    }

    pub fn dynamic_weighting(&self) -> bool {
        self.is_enabled(DYNAMIC_WEIGHTING)
    }

    /// Explicitly configured flags.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for FeatureFlags {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_flag_enabled() {
        let flags = FeatureFlags::new();
        assert!(flags.is_enabled("checkinGates.anything"));
        assert!(flags.enhanced_analysis());
    }

    #[test]
    fn test_gate_flag_lookup() {
        let flags = FeatureFlags::new().with("checkinGates.texture", false);
        assert!(!flags.gate_enabled(GateKind::Texture));
        assert!(flags.gate_enabled(GateKind::Edges));
    }

    #[test]
    fn test_from_toml_table() {
        let flags: FeatureFlags = toml::from_str(
            r#"
            "checkinGates.enhancedAnalysis" = false
            "checkinGates.orientation" = true
            "#,
        )
        .unwrap();

        assert!(!flags.enhanced_analysis());
        assert_eq!(flags.iter().count(), 2);
    }
}
