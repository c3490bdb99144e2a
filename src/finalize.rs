//! Payload assembly and the finalize sequence
//!
//! Registration aggregates every buffered sample; login submits the single
//! sample of the current attempt. Before a registration payload is handed
//! over, the configured processing stages are shown one after another.

use crate::buffer::SampleBuffer;
use crate::callbacks::CaptureCallbacks;
use crate::config::ProcessingStage;
use crate::errors::CaptureError;
use crate::scheduler::StopListener;
use crate::session::CaptureSession;
use crate::status::{StatusKind, StatusUpdate};
use crate::types::{Point, Variant};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationPayload {
    pub descriptors: Vec<Vec<f32>>,
    pub landmarks: Vec<Vec<Point>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginPayload {
    pub descriptor: Vec<f32>,
    pub landmarks: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Registration(RegistrationPayload),
    Login(LoginPayload),
}

impl Payload {
    /// Build the payload from the buffer, in buffer order.
    pub fn assemble(variant: Variant, samples: &SampleBuffer) -> Result<Self, CaptureError> {
        if samples.is_empty() {
            return Err(CaptureError::Serialization(
                "no samples to finalize".to_string(),
            ));
        }

        match variant {
            Variant::Registration => Ok(Payload::Registration(RegistrationPayload {
                descriptors: samples.iter().map(|s| s.descriptor().to_vec()).collect(),
                landmarks: samples.iter().map(|s| s.landmarks().to_vec()).collect(),
            })),
            Variant::Login => {
                let latest = &samples.samples()[samples.len() - 1];
                Ok(Payload::Login(LoginPayload {
                    descriptor: latest.descriptor().to_vec(),
                    landmarks: latest.landmarks().to_vec(),
                }))
            }
        }
    }

    pub fn to_json(&self) -> Result<String, CaptureError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    Accepted,
    Rejected(CaptureError),
    /// The session was stopped before the caller saw a payload or verdict
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Finalizer {
    stages: Vec<ProcessingStage>,
    close_delay: Option<Duration>,
}

impl Finalizer {
    pub fn new(stages: Vec<ProcessingStage>, close_delay: Option<Duration>) -> Self {
        Self {
            stages,
            close_delay,
        }
    }

    pub fn stages(&self) -> &[ProcessingStage] {
        &self.stages
    }

    /// Total cosmetic delay before the payload is handed over.
    pub fn staged_delay(&self) -> Duration {
        self.stages.iter().map(ProcessingStage::duration).sum()
    }

    /// Assemble, pace, serialize and submit the session's payload.
    pub async fn run(
        &self,
        session: &CaptureSession,
        callbacks: &dyn CaptureCallbacks,
        stop: &mut StopListener,
    ) -> FinalizeOutcome {
        let payload = match Payload::assemble(session.variant(), session.samples()) {
            Ok(payload) => payload,
            Err(e) => return FinalizeOutcome::Rejected(e),
        };

        for (index, stage) in self.stages.iter().enumerate() {
            if stop.is_stopped() {
                return FinalizeOutcome::Cancelled;
            }
            callbacks.on_status(&StatusUpdate::new(
                session,
                StatusKind::Processing {
                    stage: index + 1,
                    message: stage.message.clone(),
                },
            ));
            tokio::select! {
                biased;
                _ = stop.stopped() => return FinalizeOutcome::Cancelled,
                _ = tokio::time::sleep(stage.duration()) => {}
            }
        }

        let json = match payload.to_json() {
            Ok(json) => json,
            Err(e) => return FinalizeOutcome::Rejected(e),
        };
        if stop.is_stopped() {
            return FinalizeOutcome::Cancelled;
        }

        if session.variant() == Variant::Login {
            callbacks.on_status(&StatusUpdate::new(session, StatusKind::Verifying));
        }
        log::debug!(
            "Submitting {} payload for session {} ({} bytes)",
            session.variant(),
            session.id(),
            json.len()
        );

        tokio::select! {
            biased;
            _ = stop.stopped() => FinalizeOutcome::Cancelled,
            verdict = callbacks.on_success(session.id(), json) => match verdict {
                Ok(()) => FinalizeOutcome::Accepted,
                Err(e) => FinalizeOutcome::Rejected(e),
            },
        }
    }

    /// Invoke the close callback after the configured delay, unless stopped.
    ///
    /// Returns whether the callback ran.
    pub async fn close(
        &self,
        session_id: &str,
        callbacks: &dyn CaptureCallbacks,
        stop: &mut StopListener,
    ) -> bool {
        let Some(delay) = self.close_delay else {
            return false;
        };
        tokio::select! {
            biased;
            _ = stop.stopped() => return false,
            _ = tokio::time::sleep(delay) => {}
        }
        callbacks.on_close(session_id);
        true
    }
}
