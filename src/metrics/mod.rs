//! Prometheus metrics for the check-in pipeline.
//!
//! # Metrics Exposed
//!
//! ## Gate Metrics (labelled by `gate`)
//! - `carpet_checkin_gate_value` - Last raw value measured by a gate
//! - `carpet_checkin_gate_threshold` - Threshold the gate is judged against
//! - `carpet_checkin_gate_passed` - Pass state (1=passed, 0=failed)
//!
//! ## Fused Status Metrics
//! - `carpet_checkin_confidence_score` - Confidence score (0-100)
//! - `carpet_checkin_combined_ratio` - Weighted pass ratio
//! - `carpet_checkin_all_gates_passed` - Whether capture is unlocked
//! - `carpet_checkin_threshold_confidence` - Confidence of the adaptive thresholds
//!
//! ## Flow Metrics
//! - `carpet_checkin_phase` - Current phase index
//! - `carpet_checkin_transitions_total` - Accepted transitions, labelled by target
//! - `carpet_checkin_checkins_total` - Check-ins committed
//! - `carpet_checkin_rejections_total` - Photos rejected as not carpet
//! - `carpet_checkin_sensor_errors_total` - Camera and frame errors
//!
//! With the `metrics` feature, [`MetricsServer`] serves these over HTTP
//! together with the latest fused status as JSON.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
