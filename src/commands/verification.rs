use crate::callbacks::{ChannelCallbacks, SessionEvent};
use crate::commands::config::current_settings;
use crate::detector::Detector;
use crate::orchestrator;
use crate::registry::{self, SessionInfo};
use crate::source::VideoSource;
use crate::types::Variant;
use std::sync::Arc;
use tauri::{command, AppHandle, Emitter, Runtime, State};
use tokio::sync::mpsc;

pub const STATUS_EVENT: &str = "facegate://status";
pub const SUCCESS_EVENT: &str = "facegate://success";
pub const FAILURE_EVENT: &str = "facegate://failure";
pub const CLOSE_EVENT: &str = "facegate://close";

/// Detector and camera shared by every session the plugin starts
pub struct VerificationBackend {
    pub detector: Arc<dyn Detector>,
    pub source: Arc<dyn VideoSource>,
}

/// Webview event name for a session event
pub fn event_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::Status(_) => STATUS_EVENT,
        SessionEvent::Success { .. } => SUCCESS_EVENT,
        SessionEvent::Failure { .. } => FAILURE_EVENT,
        SessionEvent::Closed { .. } => CLOSE_EVENT,
    }
}

fn forward_events<R: Runtime>(app: AppHandle<R>, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    tauri::async_runtime::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Err(e) = app.emit(event_name(&event), &event) {
                log::warn!(
                    "Failed to emit {} for session {}: {}",
                    event_name(&event),
                    event.session_id(),
                    e
                );
            }
        }
    });
}

/// Start a face verification session and return its id
#[command]
pub async fn start_face_verification<R: Runtime>(
    app: AppHandle<R>,
    backend: State<'_, VerificationBackend>,
    variant: String,
) -> Result<String, String> {
    let variant: Variant = variant.parse()?;
    log::info!("Starting face {} from webview", variant);

    let settings = current_settings(variant)?;
    let (callbacks, events, verdicts) = ChannelCallbacks::with_verdicts();
    forward_events(app, events);

    let handle = orchestrator::start(
        Arc::clone(&backend.source),
        Arc::clone(&backend.detector),
        settings,
        Arc::new(callbacks),
    )
    .await
    .map_err(|e| format!("Failed to start face verification: {}", e))?;

    Ok(registry::register(handle, Some(verdicts)).await)
}

/// Stop a running session
#[command]
pub async fn stop_face_verification(session_id: String) -> Result<String, String> {
    registry::stop_session(&session_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(format!("Session {} stopped", session_id))
}

/// Deliver the backend's verdict on the payload a session submitted
#[command]
pub async fn submit_verification_result(session_id: String, accepted: bool) -> Result<(), String> {
    log::debug!("Verdict for session {}: {}", session_id, accepted);
    registry::submit_verdict(&session_id, accepted)
        .await
        .map_err(|e| e.to_string())
}

/// List running sessions
#[command]
pub async fn list_verification_sessions() -> Result<Vec<SessionInfo>, String> {
    Ok(registry::list_sessions().await)
}
