use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// Detector (model) failed to load. Fatal to the session.
    #[error("Detector initialization error: {0}")]
    InitError(String),

    /// Frame read or detector failure inside a single tick.
    #[error("Transient capture error: {0}")]
    TransientCapture(String),

    #[error("Detector call timed out after {0}ms")]
    DetectTimeout(u64),

    #[error("Sample buffer is full (capacity {capacity})")]
    BufferFull { capacity: usize },

    #[error("Verification attempts exhausted ({attempts}/{max_attempts})")]
    AttemptsExhausted { attempts: u32, max_attempts: u32 },

    #[error("Verification rejected: {0}")]
    SubmitRejected(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

impl CaptureError {
    /// Errors that end the session instead of being retried on the next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptureError::InitError(_) | CaptureError::AttemptsExhausted { .. }
        )
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(error: serde_json::Error) -> Self {
        CaptureError::Serialization(error.to_string())
    }
}
