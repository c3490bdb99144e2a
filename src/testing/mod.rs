//! Testing utilities for FaceGate
//!
//! Synthetic frames and sources, a scripted detector and recording
//! callbacks, so capture sessions run offline and deterministically.

pub mod fakes;
pub mod synthetic_data;

pub use fakes::{RecordingCallbacks, ScriptedDetector};
pub use synthetic_data::{detection, synthetic_frame, SyntheticSource};
