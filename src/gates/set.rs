//! All gates belonging to one check-in attempt.

use super::{
    ColorVarianceGate, Gate, GateKind, GateResult, MotionStabilityGate, OrientationGate,
    PatternRecognitionGate, ThresholdGate,
};
use crate::analysis::{FrameAnalyzer, FrameStatistics, ThresholdConfig};
use crate::capture::{Frame, SamplingConfig};
use crate::location::AdaptiveThresholds;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Pass state of every gate at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateSnapshot {
    pub orientation: bool,
    pub stability: bool,
    pub sharpness: bool,
    pub contrast: bool,
    pub texture: bool,
    pub edges: bool,
    pub color_variance: bool,
    pub pattern_recognition: bool,
}

impl GateSnapshot {
    /// Snapshot with every gate set to `passed`.
    pub fn uniform(passed: bool) -> Self {
        Self {
            orientation: passed,
            stability: passed,
            sharpness: passed,
            contrast: passed,
            texture: passed,
            edges: passed,
            color_variance: passed,
            pattern_recognition: passed,
        }
    }

    pub fn get(&self, kind: GateKind) -> bool {
        match kind {
            GateKind::Orientation => self.orientation,
            GateKind::Stability => self.stability,
            GateKind::Sharpness => self.sharpness,
            GateKind::Contrast => self.contrast,
            GateKind::Texture => self.texture,
            GateKind::Edges => self.edges,
            GateKind::ColorVariance => self.color_variance,
            GateKind::PatternRecognition => self.pattern_recognition,
        }
    }

    pub fn set(&mut self, kind: GateKind, passed: bool) {
        let slot = match kind {
            GateKind::Orientation => &mut self.orientation,
            GateKind::Stability => &mut self.stability,
            GateKind::Sharpness => &mut self.sharpness,
            GateKind::Contrast => &mut self.contrast,
            GateKind::Texture => &mut self.texture,
            GateKind::Edges => &mut self.edges,
            GateKind::ColorVariance => &mut self.color_variance,
            GateKind::PatternRecognition => &mut self.pattern_recognition,
        };
        *slot = passed;
    }

    pub fn basic(&self) -> [(GateKind, bool); 6] {
        GateKind::BASIC.map(|kind| (kind, self.get(kind)))
    }

    pub fn enhanced(&self) -> [(GateKind, bool); 2] {
        GateKind::ENHANCED.map(|kind| (kind, self.get(kind)))
    }
}

/// Owns one gate of each kind plus the frame analyzer feeding them.
#[derive(Debug)]
pub struct GateSet {
    orientation: OrientationGate,
    stability: MotionStabilityGate,
    sharpness: ThresholdGate,
    contrast: ThresholdGate,
    texture: ThresholdGate,
    edges: ThresholdGate,
    color_variance: ColorVarianceGate,
    pattern: PatternRecognitionGate,
    analyzer: FrameAnalyzer,
    last_statistics: Option<FrameStatistics>,
}

impl GateSet {
    pub fn new(thresholds: &ThresholdConfig, sampling: &SamplingConfig) -> Self {
        Self {
            orientation: OrientationGate::new(
                thresholds.orientation_min,
                thresholds.orientation_max,
                Duration::from_millis(sampling.orientation_debounce_ms),
            ),
            stability: MotionStabilityGate::new(
                thresholds.motion,
                Duration::from_millis(sampling.stability_dwell_ms),
            ),
            sharpness: ThresholdGate::new(GateKind::Sharpness, thresholds.sharpness),
            contrast: ThresholdGate::new(GateKind::Contrast, thresholds.contrast),
            texture: ThresholdGate::new(GateKind::Texture, thresholds.texture_complexity),
            edges: ThresholdGate::new(GateKind::Edges, thresholds.edge_density),
            color_variance: ColorVarianceGate::new(thresholds.color_variance),
            pattern: PatternRecognitionGate::new(thresholds.pattern_score),
            analyzer: FrameAnalyzer::new(),
            last_statistics: None,
        }
    }

    /// Swaps in location-adapted thresholds for the scalar gates.
    pub fn apply_thresholds(&mut self, adaptive: &AdaptiveThresholds) {
        self.sharpness.set_threshold(adaptive.sharpness);
        self.contrast.set_threshold(adaptive.contrast);
        self.edges.set_threshold(adaptive.edge_density);
        self.texture.set_threshold(adaptive.texture_complexity);
        self.stability.set_threshold(adaptive.motion);
        tracing::debug!(source = %adaptive.source, "Gate thresholds replaced");
    }

    pub fn set_dynamic_weighting(&mut self, enabled: bool) {
        self.pattern.set_dynamic_weighting(enabled);
    }

    /// Metrics tick: updates the scalar gates from a frame.
    ///
    /// Analysis failures are logged and leave every gate at its last value.
    pub fn update_metrics(&mut self, frame: &Frame, at: Instant) -> Option<FrameStatistics> {
        match self.analyzer.analyze(frame) {
            Ok(stats) => {
                self.sharpness.update(stats.sharpness);
                self.contrast.update(stats.contrast);
                self.texture.update(stats.texture_complexity);
                self.edges.update(stats.edge_density);
                self.stability.update(stats.motion_level, at);
                self.last_statistics = Some(stats.clone());
                Some(stats)
            }
            Err(e) => {
                tracing::warn!(
                    sequence = frame.sequence(),
                    error = %e,
                    "Frame analysis failed, keeping last gate values"
                );
                None
            }
        }
    }

    /// Gate tick: runs the composite gates over a frame.
    pub fn analyze_enhanced(&mut self, frame: &Frame) {
        self.color_variance.analyze(frame);
        self.pattern.analyze(frame);
    }

    pub fn handle_orientation(&mut self, beta: f64, at: Instant) {
        self.orientation.handle_event(beta, at);
    }

    /// Applies a debounced orientation event if one is due.
    pub fn poll_orientation(&mut self, now: Instant) -> bool {
        self.orientation.poll(now)
    }

    /// Forgets per-frame state so a restarted camera starts clean.
    pub fn reset_frames(&mut self) {
        self.analyzer.reset();
        self.stability.reset();
        for gate in [
            &mut self.sharpness,
            &mut self.contrast,
            &mut self.texture,
            &mut self.edges,
        ] {
            gate.clear();
        }
        self.last_statistics = None;
    }

    pub fn snapshot(&self) -> GateSnapshot {
        let mut snapshot = GateSnapshot::default();
        for gate in self.gates() {
            snapshot.set(gate.kind(), gate.passed());
        }
        snapshot
    }

    pub fn results(&self) -> Vec<GateResult> {
        self.gates().iter().map(|gate| gate.result()).collect()
    }

    pub fn result(&self, kind: GateKind) -> GateResult {
        self.gate(kind).result()
    }

    fn gates(&self) -> [&dyn Gate; 8] {
        [
            &self.orientation,
            &self.stability,
            &self.sharpness,
            &self.contrast,
            &self.texture,
            &self.edges,
            &self.color_variance,
            &self.pattern,
        ]
    }

    fn gate(&self, kind: GateKind) -> &dyn Gate {
        match kind {
            GateKind::Orientation => &self.orientation,
            GateKind::Stability => &self.stability,
            GateKind::Sharpness => &self.sharpness,
            GateKind::Contrast => &self.contrast,
            GateKind::Texture => &self.texture,
            GateKind::Edges => &self.edges,
            GateKind::ColorVariance => &self.color_variance,
            GateKind::PatternRecognition => &self.pattern,
        }
    }

    pub fn last_statistics(&self) -> Option<&FrameStatistics> {
        self.last_statistics.as_ref()
    }

    pub fn orientation(&self) -> &OrientationGate {
        &self.orientation
    }

    pub fn stability(&self) -> &MotionStabilityGate {
        &self.stability
    }

    pub fn pattern(&self) -> &PatternRecognitionGate {
        &self.pattern
    }

    pub fn color_variance(&self) -> &ColorVarianceGate {
        &self.color_variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PatternType;
    use crate::capture::{Camera, CaptureConfig, MockCamera, MockScene};
    use crate::location::{LocationContext, LocationThresholdService};

    fn frames(scene: MockScene, n: usize) -> Vec<Frame> {
        let mut camera = MockCamera::with_scene(scene, 11);
        camera.open(&CaptureConfig::with_dimensions(96, 72)).unwrap();
        (0..n).map(|_| camera.capture().unwrap()).collect()
    }

    fn gate_set() -> GateSet {
        GateSet::new(&ThresholdConfig::default(), &SamplingConfig::default())
    }

    #[test]
    fn test_fresh_set_fails_everything() {
        assert_eq!(gate_set().snapshot(), GateSnapshot::uniform(false));
    }

    #[test]
    fn test_carpet_passes_all_gates() {
        let mut gates = gate_set();
        let t0 = Instant::now();

        gates.handle_orientation(30.0, t0);
        assert!(gates.poll_orientation(t0 + Duration::from_millis(60)));

        for (i, frame) in frames(MockScene::Carpet, 7).iter().enumerate() {
            gates.update_metrics(frame, t0 + Duration::from_millis(200 * i as u64));
        }
        gates.analyze_enhanced(&frames(MockScene::Carpet, 1)[0]);

        assert_eq!(gates.snapshot(), GateSnapshot::uniform(true));
        assert_eq!(gates.pattern().detected_pattern(), Some(PatternType::Geometric));
    }

    #[test]
    fn test_wall_fails_visual_gates() {
        let mut gates = gate_set();
        let t0 = Instant::now();
        for (i, frame) in frames(MockScene::PlainWall, 7).iter().enumerate() {
            gates.update_metrics(frame, t0 + Duration::from_millis(200 * i as u64));
        }
        gates.analyze_enhanced(&frames(MockScene::PlainWall, 1)[0]);

        let snapshot = gates.snapshot();
        assert!(snapshot.stability);
        assert!(!snapshot.sharpness);
        assert!(!snapshot.contrast);
        assert!(!snapshot.texture);
        assert!(!snapshot.edges);
        assert!(!snapshot.color_variance);
        assert!(!snapshot.pattern_recognition);
    }

    #[test]
    fn test_bad_frame_keeps_previous_values() {
        let mut gates = gate_set();
        let t0 = Instant::now();
        let carpet = frames(MockScene::Carpet, 1);
        gates.update_metrics(&carpet[0], t0);
        let before = gates.results();

        let broken = Frame::new(vec![0u8; 5], 96, 72, 99);
        assert!(gates.update_metrics(&broken, t0).is_none());
        gates.analyze_enhanced(&broken);
        assert_eq!(gates.results(), before);
    }

    #[test]
    fn test_adaptive_thresholds_applied() {
        let mut gates = gate_set();
        let service = LocationThresholdService::default();
        let adaptive = service.derive(&LocationContext::for_pub("moon_under_water_watford"));

        gates.apply_thresholds(&adaptive);
        assert_eq!(gates.result(GateKind::Sharpness).threshold, 29.0);
        assert_eq!(gates.result(GateKind::Contrast).threshold, 64.0);
        assert_eq!(gates.result(GateKind::Edges).threshold, 36.0);
        assert_eq!(gates.result(GateKind::Texture).threshold, 21.0);
    }

    #[test]
    fn test_snapshot_enumeration_matches_kinds() {
        let mut snapshot = GateSnapshot::default();
        snapshot.set(GateKind::Edges, true);
        snapshot.set(GateKind::PatternRecognition, true);

        let basic_passed: Vec<GateKind> = snapshot
            .basic()
            .into_iter()
            .filter(|&(_, passed)| passed)
            .map(|(kind, _)| kind)
            .collect();
        assert_eq!(basic_passed, vec![GateKind::Edges]);
        assert_eq!(snapshot.enhanced()[1], (GateKind::PatternRecognition, true));
    }
}
