//! Caller-facing contract of a capture session
//!
//! The orchestrator reports everything through [`CaptureCallbacks`]. The
//! success callback is asynchronous: it resolves with the backend's verdict
//! on the submitted payload, which decides between completion, a login retry
//! and failure.

use crate::errors::CaptureError;
use crate::status::StatusUpdate;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, Mutex};

/// Verdict future returned by [`CaptureCallbacks::on_success`]
pub type SubmitFuture<'a> = Pin<Box<dyn Future<Output = Result<(), CaptureError>> + Send + 'a>>;

pub trait CaptureCallbacks: Send + Sync {
    fn on_status(&self, update: &StatusUpdate);

    /// Hand over the serialized payload. `Err` means the backend refused it.
    fn on_success(&self, session_id: &str, payload: String) -> SubmitFuture<'_>;

    fn on_failure(&self, session_id: &str, message: &str);

    fn on_close(&self, session_id: &str);
}

/// Everything a session reports, as one message type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Status(StatusUpdate),
    Success { session_id: String, payload: String },
    Failure { session_id: String, message: String },
    Closed { session_id: String },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::Status(update) => &update.session_id,
            SessionEvent::Success { session_id, .. }
            | SessionEvent::Failure { session_id, .. }
            | SessionEvent::Closed { session_id } => session_id,
        }
    }
}

/// Forwards session events into an unbounded channel.
///
/// Without a verdict channel every payload is accepted as soon as it is
/// sent. With one, `on_success` waits for the next verdict: `true` accepts,
/// `false` rejects, and a closed channel counts as a rejection.
pub struct ChannelCallbacks {
    events: mpsc::UnboundedSender<SessionEvent>,
    verdicts: Option<Mutex<mpsc::UnboundedReceiver<bool>>>,
}

impl ChannelCallbacks {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                events: tx,
                verdicts: None,
            },
            rx,
        )
    }

    pub fn with_verdicts() -> (
        Self,
        mpsc::UnboundedReceiver<SessionEvent>,
        mpsc::UnboundedSender<bool>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (verdict_tx, verdict_rx) = mpsc::unbounded_channel();
        (
            Self {
                events: tx,
                verdicts: Some(Mutex::new(verdict_rx)),
            },
            rx,
            verdict_tx,
        )
    }

    fn send(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Session event dropped: receiver closed");
        }
    }
}

impl CaptureCallbacks for ChannelCallbacks {
    fn on_status(&self, update: &StatusUpdate) {
        self.send(SessionEvent::Status(update.clone()));
    }

    fn on_success(&self, session_id: &str, payload: String) -> SubmitFuture<'_> {
        self.send(SessionEvent::Success {
            session_id: session_id.to_string(),
            payload,
        });

        Box::pin(async move {
            let Some(verdicts) = &self.verdicts else {
                return Ok(());
            };
            match verdicts.lock().await.recv().await {
                Some(true) => Ok(()),
                Some(false) => Err(CaptureError::SubmitRejected(
                    "payload rejected by verifier".to_string(),
                )),
                None => Err(CaptureError::SubmitRejected(
                    "verdict channel closed".to_string(),
                )),
            }
        })
    }

    fn on_failure(&self, session_id: &str, message: &str) {
        self.send(SessionEvent::Failure {
            session_id: session_id.to_string(),
            message: message.to_string(),
        });
    }

    fn on_close(&self, session_id: &str) {
        self.send(SessionEvent::Closed {
            session_id: session_id.to_string(),
        });
    }
}
