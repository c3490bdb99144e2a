//! Process-wide registry of running verification sessions
//!
//! Sessions started through the command surface are tracked here by id so
//! later calls can stop them or deliver the backend's verdict. An entry
//! removes itself when its polling loop ends.

use crate::errors::CaptureError;
use crate::orchestrator::{SessionController, SessionHandle};
use crate::types::Variant;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

struct ActiveSession {
    controller: SessionController,
    variant: Variant,
    verdicts: Option<mpsc::UnboundedSender<bool>>,
    started_at: DateTime<Utc>,
}

/// Public view of a registered session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub variant: Variant,
    pub stopping: bool,
    pub started_at: DateTime<Utc>,
}

lazy_static::lazy_static! {
    static ref SESSION_REGISTRY: Arc<RwLock<HashMap<String, ActiveSession>>> =
        Arc::new(RwLock::new(HashMap::new()));
}

/// Track a running session until its loop ends.
///
/// `verdicts` feeds the session's success callback, when the caller answers
/// payloads asynchronously.
pub async fn register(
    handle: SessionHandle,
    verdicts: Option<mpsc::UnboundedSender<bool>>,
) -> String {
    let id = handle.id().to_string();
    let entry = ActiveSession {
        controller: handle.controller(),
        variant: handle.variant(),
        verdicts,
        started_at: Utc::now(),
    };

    {
        let mut registry = SESSION_REGISTRY.write().await;
        if let Some(previous) = registry.insert(id.clone(), entry) {
            log::warn!("Replacing registered session {}", id);
            previous.controller.stop();
        }
    }

    let watched = id.clone();
    tokio::spawn(async move {
        match handle.wait().await {
            Ok(report) => log::info!(
                "Session {} ended in phase {:?} after {} ticks",
                report.session_id,
                report.final_phase,
                report.stats.ticks
            ),
            Err(e) => log::warn!("Session {} ended abnormally: {}", watched, e),
        }
        SESSION_REGISTRY.write().await.remove(&watched);
    });

    log::debug!("Registered session {}", id);
    id
}

/// Stop a registered session. Stopping twice is not an error.
pub async fn stop_session(session_id: &str) -> Result<(), CaptureError> {
    let registry = SESSION_REGISTRY.read().await;
    let session = registry
        .get(session_id)
        .ok_or_else(|| CaptureError::SessionNotFound(session_id.to_string()))?;
    session.controller.stop();
    Ok(())
}

/// Deliver the verdict on the payload a session last submitted.
pub async fn submit_verdict(session_id: &str, accepted: bool) -> Result<(), CaptureError> {
    let registry = SESSION_REGISTRY.read().await;
    let session = registry
        .get(session_id)
        .ok_or_else(|| CaptureError::SessionNotFound(session_id.to_string()))?;

    let verdicts = session.verdicts.as_ref().ok_or_else(|| {
        CaptureError::SubmitRejected(format!("session {} does not take verdicts", session_id))
    })?;
    verdicts
        .send(accepted)
        .map_err(|_| CaptureError::SessionNotFound(session_id.to_string()))
}

pub async fn list_sessions() -> Vec<SessionInfo> {
    let registry = SESSION_REGISTRY.read().await;
    let mut sessions: Vec<SessionInfo> = registry
        .iter()
        .map(|(id, session)| SessionInfo {
            session_id: id.clone(),
            variant: session.variant,
            stopping: session.controller.is_stopped(),
            started_at: session.started_at,
        })
        .collect();
    sessions.sort_by_key(|info| info.started_at);
    sessions
}

pub async fn is_registered(session_id: &str) -> bool {
    SESSION_REGISTRY.read().await.contains_key(session_id)
}
