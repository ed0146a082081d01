//! Texture features for pattern recognition.
//!
//! Carpets in pubs tend towards strong, repeating, multi-colour patterns.
//! The features here are scored 0-100 so the pattern gate can blend them
//! with a weight table chosen by the detected pattern type.

use super::{color, statistics, AnalysisError};
use crate::capture::Frame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Minimum population share for a colour bin to add to complexity.
const COMPLEXITY_FLOOR: f64 = 0.005;

/// Broad pattern class of a carpet or frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Geometric,
    Ornamental,
    Mixed,
    Plain,
}

impl PatternType {
    pub const ALL: [PatternType; 4] = [
        PatternType::Geometric,
        PatternType::Ornamental,
        PatternType::Mixed,
        PatternType::Plain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Geometric => "geometric",
            PatternType::Ornamental => "ornamental",
            PatternType::Mixed => "mixed",
            PatternType::Plain => "plain",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for PatternType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternType::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown pattern type: {s}"))
    }
}

/// Texture scores for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureFeatures {
    /// Luma standard deviation scaled to 0-100.
    pub contrast: f64,
    /// Percentage of edge pixels.
    pub edge_density: f64,
    /// Strength of the strongest spatial period, 0-100.
    pub repetition_score: f64,
    /// Share of occupied colour bins, 0-100.
    pub color_complexity: f64,
    pub pattern_type: PatternType,
    #[serde(skip)]
    pub processing_time: Duration,
}

impl TextureFeatures {
    /// Extracts texture features from a frame.
    pub fn extract(frame: &Frame) -> Result<Self, AnalysisError> {
        let started = Instant::now();
        statistics::validate(frame)?;

        let w = frame.width() as usize;
        let h = frame.height() as usize;
        let luma = frame.luma();

        let contrast = (statistics::std_dev(&luma) * 100.0 / 64.0).min(100.0);
        let edge_density = statistics::edge_density(&luma, w, h);
        let repetition_score = periodicity(&luma, w, h) * 100.0;
        let color_complexity = colour_complexity(frame);
        let pattern_type =
            classify_pattern(edge_density, repetition_score, color_complexity);

        let features = Self {
            contrast,
            edge_density,
            repetition_score,
            color_complexity,
            pattern_type,
            processing_time: started.elapsed(),
        };

        tracing::trace!(
            contrast,
            edge_density,
            repetition = repetition_score,
            complexity = color_complexity,
            pattern = %pattern_type,
            "Texture features extracted"
        );

        Ok(features)
    }
}

/// Classifies a pattern from its feature scores.
pub fn classify_pattern(edge_density: f64, repetition: f64, complexity: f64) -> PatternType {
    if edge_density < 5.0 && complexity < 15.0 {
        PatternType::Plain
    } else if repetition >= 50.0 && edge_density >= 15.0 {
        PatternType::Geometric
    } else if complexity >= 40.0 {
        PatternType::Ornamental
    } else {
        PatternType::Mixed
    }
}

fn colour_complexity(frame: &Frame) -> f64 {
    let histogram = color::colour_histogram(frame);
    let total = frame.pixel_count() as f64;
    let occupied = histogram
        .iter()
        .filter(|&&count| count as f64 / total >= COMPLEXITY_FLOOR)
        .count();
    occupied as f64 * 100.0 / color::COLOUR_BINS as f64
}

/// Peak periodic autocorrelation of luma, horizontal or vertical, in [0, 1].
pub fn periodicity(luma: &[u8], w: usize, h: usize) -> f64 {
    directional_periodicity(luma, w, h, true).max(directional_periodicity(luma, w, h, false))
}

fn directional_periodicity(luma: &[u8], w: usize, h: usize, horizontal: bool) -> f64 {
    let (len, lines) = if horizontal { (w, h) } else { (h, w) };
    let max_lag = len / 4;
    if max_lag < 3 {
        return 0.0;
    }
    let step = (lines / 64).max(1);
    let at = |line: usize, i: usize| -> f64 {
        if horizontal {
            luma[line * w + i] as f64
        } else {
            luma[i * w + line] as f64
        }
    };

    let sampled: Vec<usize> = (0..lines).step_by(step).collect();
    let count = (sampled.len() * len) as f64;
    let mean = sampled
        .iter()
        .flat_map(|&line| (0..len).map(move |i| at(line, i)))
        .sum::<f64>()
        / count;
    let variance = sampled
        .iter()
        .flat_map(|&line| (0..len).map(move |i| (at(line, i) - mean).powi(2)))
        .sum::<f64>()
        / count;
    if variance < f64::EPSILON {
        return 0.0;
    }

    let correlation: Vec<f64> = (0..=max_lag + 1)
        .map(|lag| {
            if lag == 0 {
                return 1.0;
            }
            let pairs = (sampled.len() * (len - lag)) as f64;
            let covariance: f64 = sampled
                .iter()
                .flat_map(|&line| {
                    (0..len - lag).map(move |i| (at(line, i) - mean) * (at(line, i + lag) - mean))
                })
                .sum();
            covariance / pairs / variance
        })
        .collect();

    (2..=max_lag)
        .filter(|&lag| {
            correlation[lag] > correlation[lag - 1] && correlation[lag] >= correlation[lag + 1]
        })
        .map(|lag| correlation[lag])
        .fold(0.0, f64::max)
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Camera, CaptureConfig, MockCamera, MockScene};

    fn capture(scene: MockScene) -> Frame {
        let mut camera = MockCamera::with_scene(scene, 11);
        camera.open(&CaptureConfig::with_dimensions(120, 90)).unwrap();
        camera.capture().unwrap()
    }

    #[test]
    fn test_pattern_type_parse() {
        assert_eq!("Geometric".parse::<PatternType>(), Ok(PatternType::Geometric));
        assert!("paisley".parse::<PatternType>().is_err());
        assert_eq!(PatternType::Ornamental.to_string(), "ornamental");
    }

    #[test]
    fn test_classify_pattern() {
        assert_eq!(classify_pattern(2.0, 90.0, 5.0), PatternType::Plain);
        assert_eq!(classify_pattern(30.0, 70.0, 5.0), PatternType::Geometric);
        assert_eq!(classify_pattern(30.0, 20.0, 50.0), PatternType::Ornamental);
        assert_eq!(classify_pattern(30.0, 20.0, 20.0), PatternType::Mixed);
    }

    #[test]
    fn test_stripes_are_periodic() {
        // Vertical stripes with a period of 8 pixels.
        let (w, h) = (64usize, 16usize);
        let luma: Vec<u8> = (0..w * h)
            .map(|i| if (i % w) % 8 < 4 { 20 } else { 220 })
            .collect();

        assert!(periodicity(&luma, w, h) > 0.9);
    }

    #[test]
    fn test_gradient_not_periodic() {
        let (w, h) = (64usize, 16usize);
        let luma: Vec<u8> = (0..w * h).map(|i| ((i % w) * 4) as u8).collect();

        assert_eq!(periodicity(&luma, w, h), 0.0);
    }

    #[test]
    fn test_carpet_is_geometric() {
        let features = TextureFeatures::extract(&capture(MockScene::Carpet)).unwrap();

        assert_eq!(features.pattern_type, PatternType::Geometric);
        assert!(features.repetition_score > 50.0);
        assert!(features.contrast > 80.0);
    }

    #[test]
    fn test_wall_is_plain() {
        let features = TextureFeatures::extract(&capture(MockScene::PlainWall)).unwrap();

        assert_eq!(features.pattern_type, PatternType::Plain);
        assert!(features.contrast < 5.0);
    }
}
