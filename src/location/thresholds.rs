//! Location-aware adaptive thresholds.
//!
//! Thresholds are derived from the most specific context available, first
//! match wins:
//!
//! ```text
//! pub-specific (0.9) → location-based (0.7) → pattern-based (0.6) → default (0.5)
//! ```

use super::database::{CarpetData, CarpetDatabase, CarpetSignature};
use super::geo::GeoPoint;
use crate::analysis::{PatternType, ThresholdConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Radius for the nearby-venue average, kilometres.
pub const NEARBY_RADIUS_KM: f64 = 0.5;

/// Lowest allowed sharpness/contrast/edge/texture thresholds.
const THRESHOLD_FLOORS: [f64; 4] = [5.0, 10.0, 8.0, 5.0];
const PUB_SCALE: [f64; 4] = [30.0, 60.0, 40.0, 30.0];
const NEARBY_SCALE: [f64; 4] = [25.0, 50.0, 35.0, 25.0];

/// Where a set of adaptive thresholds came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThresholdSource {
    PubSpecific,
    LocationBased,
    PatternBased,
    Default,
}

impl ThresholdSource {
    /// Confidence attached to thresholds from this source.
    pub fn confidence(&self) -> f64 {
        match self {
            ThresholdSource::PubSpecific => 0.9,
            ThresholdSource::LocationBased => 0.7,
            ThresholdSource::PatternBased => 0.6,
            ThresholdSource::Default => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdSource::PubSpecific => "pub-specific",
            ThresholdSource::LocationBased => "location-based",
            ThresholdSource::PatternBased => "pattern-based",
            ThresholdSource::Default => "default",
        }
    }
}

impl fmt::Display for ThresholdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the flow is told about the venue's carpet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarpetInfo {
    pub pattern_type: PatternType,
    pub description: String,
    pub expected_colors: Vec<String>,
}

impl From<&CarpetData> for CarpetInfo {
    fn from(venue: &CarpetData) -> Self {
        Self {
            pattern_type: venue.signature.pattern,
            description: venue.description.clone(),
            expected_colors: venue.signature.colors.clone(),
        }
    }
}

/// Thresholds adapted to the current location context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveThresholds {
    pub sharpness: f64,
    pub contrast: f64,
    pub edge_density: f64,
    pub texture_complexity: f64,
    pub motion: f64,
    pub source: ThresholdSource,
    pub confidence: f64,
    pub carpet_info: Option<CarpetInfo>,
}

impl AdaptiveThresholds {
    /// The static configuration, unadapted.
    pub fn from_config(config: &ThresholdConfig) -> Self {
        Self {
            sharpness: config.sharpness,
            contrast: config.contrast,
            edge_density: config.edge_density,
            texture_complexity: config.texture_complexity,
            motion: config.motion,
            source: ThresholdSource::Default,
            confidence: ThresholdSource::Default.confidence(),
            carpet_info: None,
        }
    }

    fn adapted(
        [sharpness, contrast, edge_density, texture_complexity]: [f64; 4],
        motion: f64,
        source: ThresholdSource,
        carpet_info: Option<CarpetInfo>,
    ) -> Self {
        Self {
            sharpness,
            contrast,
            edge_density,
            texture_complexity,
            motion,
            source,
            confidence: source.confidence(),
            carpet_info,
        }
    }

    /// True when anything more specific than the defaults was used.
    pub fn is_location_optimized(&self) -> bool {
        self.source != ThresholdSource::Default
    }
}

/// Additive sharpness/contrast/edge/texture adjustment for a pattern.
pub fn pattern_adjustment(pattern: PatternType) -> [f64; 4] {
    match pattern {
        PatternType::Geometric => [5.0, 10.0, 8.0, 0.0],
        PatternType::Ornamental => [-2.0, -5.0, 2.0, 8.0],
        PatternType::Plain => [-5.0, -10.0, -5.0, -3.0],
        PatternType::Mixed => [0.0, 0.0, 0.0, 0.0],
    }
}

fn adjust_and_floor(base: [f64; 4], pattern: PatternType) -> [f64; 4] {
    let adjustment = pattern_adjustment(pattern);
    std::array::from_fn(|i| (base[i] + adjustment[i]).max(THRESHOLD_FLOORS[i]))
}

fn scale_signature(signature: &CarpetSignature, scale: [f64; 4]) -> [f64; 4] {
    [
        (signature.texture_score * scale[0]).round(),
        (signature.contrast * scale[1]).round(),
        (signature.complexity * scale[2]).round(),
        (signature.complexity * scale[3]).round(),
    ]
}

/// Context supplied by the calling flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationContext {
    pub pub_id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Pattern known from elsewhere, used when no venue matches.
    pub pattern_hint: Option<PatternType>,
}

impl LocationContext {
    pub fn for_pub(pub_id: impl Into<String>) -> Self {
        Self {
            pub_id: Some(pub_id.into()),
            ..Default::default()
        }
    }

    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            ..Default::default()
        }
    }

    pub fn with_pub(mut self, pub_id: impl Into<String>) -> Self {
        self.pub_id = Some(pub_id.into());
        self
    }

    pub fn with_pattern_hint(mut self, pattern: PatternType) -> Self {
        self.pattern_hint = Some(pattern);
        self
    }

    pub fn point(&self) -> Option<GeoPoint> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }
}

/// Selects adaptive thresholds from the venue table.
#[derive(Debug, Clone)]
pub struct LocationThresholdService {
    database: CarpetDatabase,
    defaults: ThresholdConfig,
    current: AdaptiveThresholds,
}

impl LocationThresholdService {
    pub fn new(database: CarpetDatabase, defaults: ThresholdConfig) -> Self {
        let current = AdaptiveThresholds::from_config(&defaults);
        Self {
            database,
            defaults,
            current,
        }
    }

    /// Recomputes and stores thresholds for a new context.
    pub fn update_location(&mut self, context: &LocationContext) -> &AdaptiveThresholds {
        self.current = self.derive(context);
        tracing::info!(
            source = %self.current.source,
            confidence = self.current.confidence,
            sharpness = self.current.sharpness,
            contrast = self.current.contrast,
            edge_density = self.current.edge_density,
            texture = self.current.texture_complexity,
            "Adaptive thresholds updated"
        );
        &self.current
    }

    /// Derives thresholds for a context without storing them.
    pub fn derive(&self, context: &LocationContext) -> AdaptiveThresholds {
        if let Some(venue) = context
            .pub_id
            .as_deref()
            .and_then(|id| self.database.find_by_id(id))
        {
            return self.pub_specific(venue);
        }

        if let Some(point) = context.point() {
            if let Some(thresholds) = self.location_based(&point) {
                return thresholds;
            }
        }

        if let Some(pattern) = context.pattern_hint {
            let base = [
                self.defaults.sharpness,
                self.defaults.contrast,
                self.defaults.edge_density,
                self.defaults.texture_complexity,
            ];
            return AdaptiveThresholds::adapted(
                adjust_and_floor(base, pattern),
                self.defaults.motion,
                ThresholdSource::PatternBased,
                None,
            );
        }

        AdaptiveThresholds::from_config(&self.defaults)
    }

    fn pub_specific(&self, venue: &CarpetData) -> AdaptiveThresholds {
        let base = scale_signature(&venue.signature, PUB_SCALE);
        AdaptiveThresholds::adapted(
            adjust_and_floor(base, venue.signature.pattern),
            self.defaults.motion,
            ThresholdSource::PubSpecific,
            Some(CarpetInfo::from(venue)),
        )
    }

    fn location_based(&self, point: &GeoPoint) -> Option<AdaptiveThresholds> {
        let nearby = self.database.find_within(point, NEARBY_RADIUS_KM);
        if nearby.is_empty() {
            return None;
        }

        let n = nearby.len() as f64;
        let mean = |f: fn(&CarpetSignature) -> f64| {
            nearby.iter().map(|(v, _)| f(&v.signature)).sum::<f64>() / n
        };
        let pattern = most_frequent_pattern(nearby.iter().map(|(v, _)| v.signature.pattern));
        let averaged = CarpetSignature {
            colors: Vec::new(),
            pattern,
            brightness: mean(|s| s.brightness),
            complexity: mean(|s| s.complexity),
            texture_score: mean(|s| s.texture_score),
            contrast: mean(|s| s.contrast),
        };

        let closest = nearby
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(venue, _)| CarpetInfo::from(*venue));

        Some(AdaptiveThresholds::adapted(
            adjust_and_floor(scale_signature(&averaged, NEARBY_SCALE), pattern),
            self.defaults.motion,
            ThresholdSource::LocationBased,
            closest,
        ))
    }

    pub fn thresholds(&self) -> &AdaptiveThresholds {
        &self.current
    }

    pub fn is_location_optimized(&self) -> bool {
        self.current.is_location_optimized()
    }

    pub fn database(&self) -> &CarpetDatabase {
        &self.database
    }

    /// Drops back to the static defaults.
    pub fn reset(&mut self) {
        self.current = AdaptiveThresholds::from_config(&self.defaults);
    }
}

impl Default for LocationThresholdService {
    fn default() -> Self {
        Self::new(CarpetDatabase::seeded(), ThresholdConfig::default())
    }
}

/// Most common pattern; ties go to whichever appeared first.
fn most_frequent_pattern(patterns: impl Iterator<Item = PatternType>) -> PatternType {
    let mut counts: Vec<(PatternType, usize)> = Vec::new();
    for pattern in patterns {
        match counts.iter_mut().find(|(p, _)| *p == pattern) {
            Some((_, count)) => *count += 1,
            None => counts.push((pattern, 1)),
        }
    }
    counts
        .iter()
        .fold(None::<(PatternType, usize)>, |best, &(p, c)| match best {
            Some((_, best_count)) if best_count >= c => best,
            _ => Some((p, c)),
        })
        .map(|(p, _)| p)
        .unwrap_or(PatternType::Mixed)
}
