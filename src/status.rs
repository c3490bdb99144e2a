//! User-facing status updates emitted during a capture session

use crate::quality::RejectReason;
use crate::session::{CaptureSession, Phase};
use crate::types::Variant;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const LOADING_MESSAGE: &str = "Loading face detection models...";
pub const READY_MESSAGE: &str = "Position your face in the frame";
pub const NO_FACE_MESSAGE: &str = "No face detected. Please position your face in the frame.";
pub const NOT_ACCEPTABLE_MESSAGE: &str =
    "Face detected. Please hold still, face the camera and move a little closer.";
pub const VERIFYING_MESSAGE: &str = "Verifying face...";
pub const INIT_FAILURE_MESSAGE: &str =
    "Failed to load face detection models. Please close and try again.";
pub const EXHAUSTED_MESSAGE: &str =
    "Face verification failed. Please use password login instead.";
pub const REGISTRATION_FAILED_MESSAGE: &str =
    "Face registration was not accepted. Please close and try again.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusKind {
    Loading,
    Ready,
    NoFace,
    FaceNotAcceptable { reason: RejectReason },
    Progress { captured: usize, required: usize },
    Processing { stage: usize, message: String },
    Verifying,
    Retry { attempt: u32, max_attempts: u32 },
    Success { variant: Variant },
    Failed { message: String },
}

impl StatusKind {
    pub fn message(&self) -> String {
        match self {
            StatusKind::Loading => LOADING_MESSAGE.to_string(),
            StatusKind::Ready => READY_MESSAGE.to_string(),
            StatusKind::NoFace => NO_FACE_MESSAGE.to_string(),
            StatusKind::FaceNotAcceptable { .. } => NOT_ACCEPTABLE_MESSAGE.to_string(),
            StatusKind::Progress { captured, required } => {
                format!("Capturing face samples... {}/{}", captured, required)
            }
            StatusKind::Processing { message, .. } => message.clone(),
            StatusKind::Verifying => VERIFYING_MESSAGE.to_string(),
            StatusKind::Retry {
                attempt,
                max_attempts,
            } => format!(
                "Face not recognized ({}/{}). Please try again.",
                attempt, max_attempts
            ),
            StatusKind::Success {
                variant: Variant::Registration,
            } => "Face registration complete!".to_string(),
            StatusKind::Success {
                variant: Variant::Login,
            } => "Face verified!".to_string(),
            StatusKind::Failed { message } => message.clone(),
        }
    }
}

/// One status line for the UI, stamped with the session state it describes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub session_id: String,
    pub phase: Phase,
    pub kind: StatusKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn new(session: &CaptureSession, kind: StatusKind) -> Self {
        Self {
            session_id: session.id().to_string(),
            phase: session.phase(),
            message: kind.message(),
            kind,
            timestamp: Utc::now(),
        }
    }
}
