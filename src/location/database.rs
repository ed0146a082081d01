//! Reference table of known venues and their carpet signatures.

use super::geo::{haversine_km, GeoPoint};
use crate::analysis::PatternType;
use serde::{Deserialize, Serialize};

/// Precomputed visual signature of a venue's carpet. Scores are in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarpetSignature {
    /// Three or four hex colours.
    pub colors: Vec<String>,
    pub pattern: PatternType,
    pub brightness: f64,
    pub complexity: f64,
    pub texture_score: f64,
    pub contrast: f64,
}

/// A venue with its location and carpet signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarpetData {
    pub pub_id: String,
    pub location: GeoPoint,
    pub description: String,
    pub signature: CarpetSignature,
}

/// Read-only venue table.
#[derive(Debug, Clone)]
pub struct CarpetDatabase {
    entries: Vec<CarpetData>,
}

fn entry(
    pub_id: &str,
    lat: f64,
    lng: f64,
    description: &str,
    colors: &[&str],
    pattern: PatternType,
    [brightness, complexity, texture_score, contrast]: [f64; 4],
) -> CarpetData {
    CarpetData {
        pub_id: pub_id.to_string(),
        location: GeoPoint::new(lat, lng),
        description: description.to_string(),
        signature: CarpetSignature {
            colors: colors.iter().map(|c| c.to_string()).collect(),
            pattern,
            brightness,
            complexity,
            texture_score,
            contrast,
        },
    }
}

impl CarpetDatabase {
    pub fn new(entries: Vec<CarpetData>) -> Self {
        Self { entries }
    }

    /// The built-in venue table.
    pub fn seeded() -> Self {
        Self::new(vec![
            entry(
                "moon_under_water_watford",
                51.6565,
                -0.3960,
                "Burgundy and gold interlocking squares on a navy field",
                &["#8B1A1A", "#D4A017", "#1B2A49", "#F5E6C8"],
                PatternType::Geometric,
                [0.45, 0.7, 0.8, 0.9],
            ),
            entry(
                "the_essex_arms_watford",
                51.6585,
                -0.3990,
                "Dense floral scrollwork in deep green and ochre",
                &["#1E4D2B", "#C8962E", "#6B2D1F", "#E8D8B0"],
                PatternType::Ornamental,
                [0.35, 0.9, 0.5, 0.5],
            ),
            entry(
                "the_moon_on_the_hill_harrow",
                51.5808,
                -0.3366,
                "Teal diamonds broken up by sprays of red leaves",
                &["#0F5C5C", "#A8322D", "#D9C27A", "#2B2B2B"],
                PatternType::Mixed,
                [0.5, 0.6, 0.6, 0.6],
            ),
            entry(
                "the_crosse_keys_london",
                51.5126,
                -0.0860,
                "Gilded medallions on crimson with a fleur-de-lis border",
                &["#9E1B32", "#C9A227", "#3A1F14", "#F2E3C6"],
                PatternType::Ornamental,
                [0.4, 0.85, 0.7, 0.75],
            ),
            entry(
                "the_knights_templar_london",
                51.5145,
                -0.1117,
                "Repeating red crosses inside blue octagons",
                &["#B22222", "#1C3F7A", "#E0C068", "#101820"],
                PatternType::Geometric,
                [0.4, 0.65, 0.75, 0.85],
            ),
            entry(
                "the_metropolitan_bar_london",
                51.5226,
                -0.1571,
                "Worn plain burgundy with a faint fleck",
                &["#5E1A24", "#6E2530", "#4A141C"],
                PatternType::Plain,
                [0.3, 0.2, 0.3, 0.2],
            ),
        ])
    }

    pub fn find_by_id(&self, pub_id: &str) -> Option<&CarpetData> {
        self.entries.iter().find(|e| e.pub_id == pub_id)
    }

    /// Venues within `radius_km` of a point, in table order, with distances.
    pub fn find_within(&self, point: &GeoPoint, radius_km: f64) -> Vec<(&CarpetData, f64)> {
        self.entries
            .iter()
            .map(|e| (e, haversine_km(point, &e.location)))
            .filter(|&(_, d)| d <= radius_km)
            .collect()
    }

    /// Closest venue to a point.
    pub fn nearest(&self, point: &GeoPoint) -> Option<(&CarpetData, f64)> {
        self.entries
            .iter()
            .map(|e| (e, haversine_km(point, &e.location)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CarpetData> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CarpetDatabase {
    fn default() -> Self {
        Self::seeded()
    }
}
