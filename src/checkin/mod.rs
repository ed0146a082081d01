//! The user-facing check-in flow.
//!
//! [`PhaseMachine`] sequences the flow, [`SamplingSchedule`] paces frame
//! analysis, and [`CheckinSession`] ties camera, gates, coordinator and
//! thresholds together for one attempt.

mod phase;
mod schedule;
mod session;
mod sink;

pub use phase::{CheckinPhase, InvalidTransition, PhaseListener, PhaseMachine, PhaseRecord};
pub use schedule::{SamplingSchedule, Ticker, Ticks};
pub use session::{CheckinError, CheckinOutcome, CheckinSession};
pub use sink::{
    CheckinRecord, CheckinSink, GateStatusVerifier, MemorySink, PhotoVerifier, ScriptedVerifier,
    SinkError, Verdict,
};
