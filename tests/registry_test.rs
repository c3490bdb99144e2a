use facegate::callbacks::{ChannelCallbacks, SessionEvent};
use facegate::orchestrator;
use facegate::registry;
use facegate::testing::{detection, RecordingCallbacks, ScriptedDetector, SyntheticSource};
use facegate::{CaptureError, SessionSettings, Variant};
use std::sync::Arc;
use std::time::Duration;

async fn wait_until_unregistered(session_id: &str) -> bool {
    for _ in 0..200 {
        if !registry::is_registered(session_id).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test(start_paused = true)]
async fn verdict_completes_registered_session() {
    let face = Some(detection(120.0, 130.0, 0.9));
    let (callbacks, mut events, verdicts) = ChannelCallbacks::with_verdicts();
    let handle = orchestrator::start(
        Arc::new(SyntheticSource::new()),
        Arc::new(ScriptedDetector::new(vec![face])),
        SessionSettings::login(),
        Arc::new(callbacks),
    )
    .await
    .unwrap();

    let id = registry::register(handle, Some(verdicts)).await;
    let listed = registry::list_sessions().await;
    let info = listed.iter().find(|info| info.session_id == id).unwrap();
    assert_eq!(info.variant, Variant::Login);
    assert!(!info.stopping);

    loop {
        match events.recv().await {
            Some(SessionEvent::Success { session_id, .. }) => {
                assert_eq!(session_id, id);
                break;
            }
            Some(_) => continue,
            None => panic!("session ended before submitting"),
        }
    }

    registry::submit_verdict(&id, true).await.unwrap();
    assert!(wait_until_unregistered(&id).await);
    assert!(matches!(
        registry::submit_verdict(&id, true).await,
        Err(CaptureError::SessionNotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn stop_removes_registered_session() {
    let handle = orchestrator::start(
        Arc::new(SyntheticSource::new()),
        Arc::new(ScriptedDetector::new(vec![])),
        SessionSettings::registration(),
        Arc::new(RecordingCallbacks::new()),
    )
    .await
    .unwrap();

    let id = registry::register(handle, None).await;
    assert!(registry::is_registered(&id).await);

    assert!(matches!(
        registry::submit_verdict(&id, true).await,
        Err(CaptureError::SubmitRejected(_))
    ));

    registry::stop_session(&id).await.unwrap();
    assert!(wait_until_unregistered(&id).await);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let err = registry::stop_session("no-such-session").await.unwrap_err();
    assert_eq!(
        err,
        CaptureError::SessionNotFound("no-such-session".to_string())
    );
}
