//! Scripted detector and recording callbacks

use crate::callbacks::{CaptureCallbacks, SessionEvent, SubmitFuture};
use crate::detector::{Detector, DetectorFuture};
use crate::errors::CaptureError;
use crate::status::StatusUpdate;
use crate::types::{DetectionResult, Frame};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Replays a fixed list of detection results, then misses forever.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Option<DetectionResult>>>,
    delay: Option<Duration>,
    fail_init: bool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Option<DetectionResult>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    /// Every detect call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn push(&self, result: Option<DetectionResult>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(result);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of detect calls ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn initialize(&self) -> DetectorFuture<'_, ()> {
        Box::pin(async move {
            if self.fail_init {
                Err(CaptureError::InitError("model weights unavailable".to_string()))
            } else {
                Ok(())
            }
        })
    }

    fn detect<'a>(&'a self, _frame: &'a Frame) -> DetectorFuture<'a, Option<DetectionResult>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            let _guard = InFlight(&self.in_flight);
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let next = self
                .script
                .lock()
                .map_err(|_| CaptureError::TransientCapture("script lock poisoned".to_string()))?
                .pop_front();
            Ok(next.flatten())
        })
    }
}

/// Records every session event; answers payloads from a verdict queue.
///
/// An empty queue accepts.
#[derive(Debug, Default)]
pub struct RecordingCallbacks {
    events: Mutex<Vec<SessionEvent>>,
    verdicts: Mutex<VecDeque<bool>>,
}

impl RecordingCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verdicts(verdicts: Vec<bool>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.into()),
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn statuses(&self) -> Vec<StatusUpdate> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Status(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    pub fn status_count(&self) -> usize {
        self.statuses().len()
    }

    pub fn last_message(&self) -> Option<String> {
        self.statuses().pop().map(|update| update.message)
    }

    pub fn payloads(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Success { payload, .. } => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Failure { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().len()
    }

    pub fn close_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, SessionEvent::Closed { .. }))
            .count()
    }

    fn record(&self, event: SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl CaptureCallbacks for RecordingCallbacks {
    fn on_status(&self, update: &StatusUpdate) {
        self.record(SessionEvent::Status(update.clone()));
    }

    fn on_success(&self, session_id: &str, payload: String) -> SubmitFuture<'_> {
        self.record(SessionEvent::Success {
            session_id: session_id.to_string(),
            payload,
        });
        let accepted = self
            .verdicts
            .lock()
            .ok()
            .and_then(|mut verdicts| verdicts.pop_front())
            .unwrap_or(true);

        Box::pin(async move {
            if accepted {
                Ok(())
            } else {
                Err(CaptureError::SubmitRejected("face not recognized".to_string()))
            }
        })
    }

    fn on_failure(&self, session_id: &str, message: &str) {
        self.record(SessionEvent::Failure {
            session_id: session_id.to_string(),
            message: message.to_string(),
        });
    }

    fn on_close(&self, session_id: &str) {
        self.record(SessionEvent::Closed {
            session_id: session_id.to_string(),
        });
    }
}
