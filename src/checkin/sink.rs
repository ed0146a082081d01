//! Downstream collaborators: photo verification and check-in persistence.
//!
//! Both are black boxes to the session. The in-memory implementations here
//! back the CLI demo and the tests.

use crate::capture::CapturedPhoto;
use crate::coordinator::{CarpetConfidence, IntelligentGateStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

/// Errors reported by downstream services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Outcome of verifying a captured photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Carpet,
    NotCarpet { reason: String },
}

/// Judges whether a captured photo shows a carpet.
pub trait PhotoVerifier {
    fn verify(
        &mut self,
        photo: &CapturedPhoto,
        status: Option<&IntelligentGateStatus>,
    ) -> Result<Verdict, SinkError>;
}

/// What is persisted for a successful check-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRecord {
    pub pub_id: Option<String>,
    pub photo_fingerprint: String,
    pub photo_bytes: usize,
    pub carpet_confidence: Option<CarpetConfidence>,
    pub confidence_score: Option<f64>,
    pub captured_at: DateTime<Utc>,
    pub committed_at: DateTime<Utc>,
}

impl CheckinRecord {
    pub fn new(
        pub_id: Option<String>,
        photo: &CapturedPhoto,
        status: Option<&IntelligentGateStatus>,
    ) -> Self {
        Self {
            pub_id,
            photo_fingerprint: photo.fingerprint().to_string(),
            photo_bytes: photo.bytes().len(),
            carpet_confidence: status.map(|s| s.carpet_confidence),
            confidence_score: status.map(|s| s.confidence_score),
            captured_at: photo.captured_at(),
            committed_at: Utc::now(),
        }
    }
}

/// Accepts a check-in record and its photo.
pub trait CheckinSink {
    fn commit(&mut self, record: &CheckinRecord, photo: &CapturedPhoto) -> Result<(), SinkError>;
}

/// Accepts photos whose fused gate status reaches a minimum confidence.
#[derive(Debug, Clone)]
pub struct GateStatusVerifier {
    min_confidence: CarpetConfidence,
}

impl GateStatusVerifier {
    pub fn new(min_confidence: CarpetConfidence) -> Self {
        Self { min_confidence }
    }
}

impl Default for GateStatusVerifier {
    fn default() -> Self {
        Self::new(CarpetConfidence::Likely)
    }
}

impl PhotoVerifier for GateStatusVerifier {
    fn verify(
        &mut self,
        _photo: &CapturedPhoto,
        status: Option<&IntelligentGateStatus>,
    ) -> Result<Verdict, SinkError> {
        let confidence = status.map_or(CarpetConfidence::No, |s| s.carpet_confidence);
        if confidence >= self.min_confidence {
            Ok(Verdict::Carpet)
        } else {
            Ok(Verdict::NotCarpet {
                reason: format!("carpet confidence {confidence} is below {}", self.min_confidence),
            })
        }
    }
}

/// Replays queued verdicts, then falls back to a default.
#[derive(Debug, Clone)]
pub struct ScriptedVerifier {
    script: VecDeque<Result<Verdict, SinkError>>,
    fallback: Verdict,
    calls: usize,
}

impl ScriptedVerifier {
    pub fn new(script: impl IntoIterator<Item = Result<Verdict, SinkError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: Verdict::Carpet,
            calls: 0,
        }
    }

    pub fn always(verdict: Verdict) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: verdict,
            calls: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl PhotoVerifier for ScriptedVerifier {
    fn verify(
        &mut self,
        _photo: &CapturedPhoto,
        _status: Option<&IntelligentGateStatus>,
    ) -> Result<Verdict, SinkError> {
        self.calls += 1;
        self.script
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Keeps committed records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<CheckinRecord>,
    failures: VecDeque<SinkError>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit fail with `error`.
    pub fn fail_next(&mut self, error: SinkError) {
        self.failures.push_back(error);
    }

    pub fn records(&self) -> &[CheckinRecord] {
        &self.records
    }
}

impl CheckinSink for MemorySink {
    fn commit(&mut self, record: &CheckinRecord, _photo: &CapturedPhoto) -> Result<(), SinkError> {
        if let Some(error) = self.failures.pop_front() {
            return Err(error);
        }
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;

    fn photo() -> CapturedPhoto {
        CapturedPhoto::encode(&Frame::solid(16, 16, [120, 40, 40], 3), 80, 1).unwrap()
    }

    #[test]
    fn test_status_verifier_without_status_rejects() {
        let verdict = GateStatusVerifier::default().verify(&photo(), None).unwrap();
        assert!(matches!(verdict, Verdict::NotCarpet { .. }));
    }

    #[test]
    fn test_scripted_verifier_replays_then_falls_back() {
        let mut verifier = ScriptedVerifier::new([
            Ok(Verdict::NotCarpet {
                reason: "tiles".into(),
            }),
            Err(SinkError::Unavailable("timeout".into())),
        ]);
        let photo = photo();

        assert!(matches!(
            verifier.verify(&photo, None),
            Ok(Verdict::NotCarpet { .. })
        ));
        assert!(verifier.verify(&photo, None).is_err());
        assert_eq!(verifier.verify(&photo, None), Ok(Verdict::Carpet));
        assert_eq!(verifier.calls(), 3);
    }

    #[test]
    fn test_memory_sink_failure_then_success() {
        let photo = photo();
        let record = CheckinRecord::new(Some("the_crosse_keys_london".into()), &photo, None);
        let mut sink = MemorySink::new();
        sink.fail_next(SinkError::Rejected("duplicate".into()));

        assert!(sink.commit(&record, &photo).is_err());
        assert!(sink.records().is_empty());

        sink.commit(&record, &photo).unwrap();
        assert_eq!(sink.records()[0].photo_fingerprint, photo.fingerprint());
        assert_eq!(sink.records()[0].photo_bytes, photo.bytes().len());
    }
}
