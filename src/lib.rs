//! Carpet Check-in Library
//!
//! Camera-gated verification for pub check-ins. Live frames are scored by
//! a set of independent signal gates, the gate outputs are fused into one
//! confidence verdict, and a phase machine only unlocks capture once every
//! enabled gate passes.
//!
//! # Architecture
//!
//! ```text
//! capture → analysis → gates → coordinator → checkin
//!                        ↑
//!                    location (adaptive thresholds)
//! ```
//!
//! # Design Principles
//!
//! - **Pure gates**: a gate's pass state is derived from its last value,
//!   its threshold and any captured features, never stored
//! - **Errors stay local**: analysis failures are logged and leave a gate at
//!   its last value; only a camera start failure reaches the caller
//! - **One owner per attempt**: every stateful piece lives in a
//!   [`CheckinSession`]
//!
//! # Example
//!
//! ```no_run
//! use carpet_checkin::{
//!     analysis::ThresholdConfig,
//!     capture::{Camera, CaptureConfig, MockCamera, SamplingConfig},
//!     coordinator::GateCoordinator,
//!     gates::GateSet,
//!     location::{LocationContext, LocationThresholdService},
//! };
//! use std::time::Instant;
//!
//! let mut camera = MockCamera::new();
//! camera.open(&CaptureConfig::default()).unwrap();
//!
//! let mut gates = GateSet::new(&ThresholdConfig::default(), &SamplingConfig::default());
//! let mut thresholds = LocationThresholdService::default();
//! gates.apply_thresholds(
//!     thresholds.update_location(&LocationContext::for_pub("moon_under_water_watford")),
//! );
//!
//! let frame = camera.capture().unwrap();
//! gates.update_metrics(&frame, Instant::now());
//! gates.analyze_enhanced(&frame);
//!
//! let status = GateCoordinator::default().evaluate(&gates.snapshot(), thresholds.thresholds());
//! println!("{} ({:.0})", status.carpet_confidence, status.confidence_score);
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod capture;
pub mod checkin;
pub mod coordinator;
pub mod gates;
pub mod location;
pub mod metrics;

// Re-export commonly used types at crate root
pub use analysis::{PatternType, ThresholdConfig};
pub use capture::{Camera, CaptureConfig, FileConfig, Frame, MockCamera};
pub use checkin::{CheckinPhase, CheckinSession, PhaseMachine};
pub use coordinator::{CarpetConfidence, FeatureFlags, GateCoordinator, IntelligentGateStatus};
pub use gates::{Gate, GateKind, GateSet};
pub use location::{AdaptiveThresholds, CarpetDatabase, LocationThresholdService};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
