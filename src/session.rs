//! Capture session state machine
//!
//! A [`CaptureSession`] is a plain value. Every change goes through
//! [`CaptureSession::apply`], which consumes the old state and returns the
//! next one, so the orchestrator never mutates phase, buffer and flags
//! independently of each other.

use crate::assert_invariant;
use crate::buffer::SampleBuffer;
use crate::errors::CaptureError;
use crate::invariants::{
    ATTEMPTS_BOUNDED, ATTEMPTS_MONOTONIC, FINALIZE_ONLY_WHEN_FULL, SAMPLES_WITHIN_CAPACITY,
    SINGLE_FINALIZE,
};
use crate::types::{Sample, Variant};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    AwaitingFace,
    Sampling,
    Finalizing,
    Complete,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initializing => "initializing",
            Phase::AwaitingFace => "awaiting_face",
            Phase::Sampling => "sampling",
            Phase::Finalizing => "finalizing",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
        }
    }
}

/// Inputs to the session reducer
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    InitSucceeded,
    InitFailed,
    NoFace,
    /// A face was found but the quality gate turned it down
    FaceRejected,
    SampleAccepted(Sample),
    FinalizeSucceeded,
    /// The caller rejected the submitted payload
    FinalizeFailed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    id: String,
    variant: Variant,
    phase: Phase,
    samples: SampleBuffer,
    attempt_count: u32,
    max_attempts: Option<u32>,
    is_processing: bool,
    cancelled: bool,
}

impl CaptureSession {
    pub fn new(variant: Variant, required_samples: usize, max_attempts: Option<u32>) -> Self {
        Self::with_id(
            uuid::Uuid::new_v4().to_string(),
            variant,
            required_samples,
            max_attempts,
        )
    }

    pub fn with_id(
        id: String,
        variant: Variant,
        required_samples: usize,
        max_attempts: Option<u32>,
    ) -> Self {
        Self {
            id,
            variant,
            phase: Phase::Initializing,
            samples: SampleBuffer::new(required_samples),
            attempt_count: 0,
            max_attempts: max_attempts.map(|max| max.max(1)),
            is_processing: false,
            cancelled: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn required_samples(&self) -> usize {
        self.samples.capacity()
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// True while ticks may still change this session.
    pub fn is_active(&self) -> bool {
        !self.cancelled && !self.phase.is_terminal()
    }

    /// Compute the next state.
    ///
    /// Transitions that do not apply to the current phase, and anything
    /// arriving after cancellation or a terminal phase, leave the session
    /// unchanged. The only error is a sample arriving at a full buffer.
    pub fn apply(mut self, transition: Transition) -> Result<Self, CaptureError> {
        if let Transition::Cancelled = transition {
            self.cancelled = true;
            return Ok(self);
        }
        if !self.is_active() {
            log::debug!(
                "Session {} ignoring {:?} in phase {:?}",
                self.id,
                transition,
                self.phase
            );
            return Ok(self);
        }

        match (self.phase, transition) {
            (Phase::Initializing, Transition::InitSucceeded) => {
                self.phase = Phase::AwaitingFace;
            }
            (Phase::Initializing, Transition::InitFailed) => {
                self.phase = Phase::Failed;
            }
            (Phase::AwaitingFace | Phase::Sampling, Transition::NoFace) => {
                self.phase = Phase::AwaitingFace;
            }
            (Phase::AwaitingFace | Phase::Sampling, Transition::FaceRejected) => {
                self.phase = Phase::Sampling;
            }
            (Phase::AwaitingFace | Phase::Sampling, Transition::SampleAccepted(sample)) => {
                self.phase = Phase::Sampling;
                let count = self.samples.append(sample)?;
                assert_invariant!(
                    count <= self.samples.capacity(),
                    SAMPLES_WITHIN_CAPACITY,
                    self.id.as_str()
                );

                if self.samples.is_full() {
                    assert_invariant!(!self.is_processing, SINGLE_FINALIZE, self.id.as_str());
                    assert_invariant!(
                        count == self.samples.capacity(),
                        FINALIZE_ONLY_WHEN_FULL,
                        self.id.as_str()
                    );
                    self.is_processing = true;
                    self.phase = Phase::Finalizing;
                }
            }
            (Phase::Finalizing, Transition::SampleAccepted(_)) => {
                return Err(CaptureError::BufferFull {
                    capacity: self.samples.capacity(),
                });
            }
            (Phase::Finalizing, Transition::FinalizeSucceeded) => {
                // is_processing stays set: nothing runs after completion
                self.phase = Phase::Complete;
            }
            (Phase::Finalizing, Transition::FinalizeFailed) => match self.max_attempts {
                Some(max_attempts) => {
                    let previous = self.attempt_count;
                    self.attempt_count = self.attempt_count.saturating_add(1);
                    assert_invariant!(
                        self.attempt_count > previous,
                        ATTEMPTS_MONOTONIC,
                        self.id.as_str()
                    );
                    assert_invariant!(
                        self.attempt_count <= max_attempts,
                        ATTEMPTS_BOUNDED,
                        self.id.as_str()
                    );

                    if self.attempt_count >= max_attempts {
                        self.phase = Phase::Failed;
                    } else {
                        // Each login attempt stands alone
                        self.samples.clear();
                        self.is_processing = false;
                        self.phase = Phase::Sampling;
                    }
                }
                None => {
                    self.phase = Phase::Failed;
                }
            },
            (phase, transition) => {
                log::debug!(
                    "Session {} ignoring {:?} in phase {:?}",
                    self.id,
                    transition,
                    phase
                );
            }
        }

        Ok(self)
    }
}
