/// Per-detection quality gating
///
/// Decides whether a single detection is good enough to be kept as a sample.
/// Registration demands a confident detector; login only checks face size.
pub mod gate;

pub use gate::{GateDecision, QualityGate, RejectReason};
