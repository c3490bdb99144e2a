//! Login flow tests: single-sample attempts with bounded retries

use facegate::orchestrator::{CaptureOrchestrator, TickOutcome};
use facegate::scheduler::ManualTicker;
use facegate::status::{StatusKind, EXHAUSTED_MESSAGE};
use facegate::testing::{detection, RecordingCallbacks, ScriptedDetector, SyntheticSource};
use facegate::{CaptureError, DetectionResult, Phase, SessionSettings};
use std::sync::Arc;
use std::time::Duration;

fn login(
    script: Vec<Option<DetectionResult>>,
    settings: SessionSettings,
    callbacks: Arc<RecordingCallbacks>,
) -> (CaptureOrchestrator, Arc<ScriptedDetector>) {
    let detector = Arc::new(ScriptedDetector::new(script));
    let orchestrator = CaptureOrchestrator::new(
        Arc::new(SyntheticSource::new()),
        detector.clone(),
        settings,
        callbacks,
    );
    (orchestrator, detector)
}

#[tokio::test(start_paused = true)]
async fn low_confidence_face_is_submitted_immediately() {
    let callbacks = Arc::new(RecordingCallbacks::new());
    let mut face = detection(120.0, 130.0, 0.4);
    face.descriptor = vec![0.1, 0.2, 0.3];
    let (mut orch, _) = login(vec![Some(face)], SessionSettings::login(), callbacks.clone());
    orch.initialize().await.unwrap();

    let start = tokio::time::Instant::now();
    assert_eq!(orch.on_tick().await, TickOutcome::Completed);
    assert!(start.elapsed() < Duration::from_millis(100));

    let payloads = callbacks.payloads();
    assert_eq!(payloads.len(), 1);
    let json: serde_json::Value = serde_json::from_str(&payloads[0]).unwrap();
    let descriptor: Vec<f32> = serde_json::from_value(json["descriptor"].clone()).unwrap();
    assert_eq!(descriptor, vec![0.1, 0.2, 0.3]);
    assert_eq!(json["landmarks"].as_array().unwrap().len(), 68);

    let kinds: Vec<StatusKind> = callbacks.statuses().into_iter().map(|s| s.kind).collect();
    assert!(kinds.contains(&StatusKind::Verifying));
    assert!(!kinds
        .iter()
        .any(|kind| matches!(kind, StatusKind::Processing { .. })));
    assert_eq!(callbacks.close_count(), 0);
    assert_eq!(orch.session().phase(), Phase::Complete);
}

#[tokio::test(start_paused = true)]
async fn three_rejections_exhaust_attempts() {
    let callbacks = Arc::new(RecordingCallbacks::with_verdicts(vec![false, false, false]));
    let face = Some(detection(120.0, 130.0, 0.9));
    let (mut orch, detector) = login(
        vec![face.clone(), face.clone(), face.clone(), face],
        SessionSettings::login().without_delays(),
        callbacks.clone(),
    );
    orch.initialize().await.unwrap();

    assert_eq!(
        orch.on_tick().await,
        TickOutcome::Retrying {
            attempt: 1,
            max_attempts: 3
        }
    );
    assert_eq!(orch.session().sample_count(), 0);
    assert_eq!(
        orch.on_tick().await,
        TickOutcome::Retrying {
            attempt: 2,
            max_attempts: 3
        }
    );
    assert_eq!(
        orch.on_tick().await,
        TickOutcome::Failed(CaptureError::AttemptsExhausted {
            attempts: 3,
            max_attempts: 3
        })
    );

    assert_eq!(orch.session().attempt_count(), 3);
    assert_eq!(orch.session().phase(), Phase::Failed);
    assert_eq!(callbacks.failures(), vec![EXHAUSTED_MESSAGE.to_string()]);
    assert_eq!(callbacks.last_message().as_deref(), Some(EXHAUSTED_MESSAGE));

    // Polling halted
    assert!(matches!(orch.on_tick().await, TickOutcome::Skipped(_)));
    assert_eq!(detector.calls(), 3);
    assert_eq!(callbacks.failure_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_attempt_limit_fails_after_one_rejection() {
    let callbacks = Arc::new(RecordingCallbacks::with_verdicts(vec![false]));
    let face = Some(detection(120.0, 130.0, 0.9));
    let mut settings = SessionSettings::login().without_delays();
    settings.max_attempts = Some(0);
    let (mut orch, detector) = login(vec![face.clone(), face], settings, callbacks.clone());
    orch.initialize().await.unwrap();

    assert_eq!(
        orch.on_tick().await,
        TickOutcome::Failed(CaptureError::AttemptsExhausted {
            attempts: 1,
            max_attempts: 1
        })
    );
    assert_eq!(callbacks.failures(), vec![EXHAUSTED_MESSAGE.to_string()]);
    assert!(matches!(orch.on_tick().await, TickOutcome::Skipped(_)));
    assert_eq!(detector.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_then_success() {
    let callbacks = Arc::new(RecordingCallbacks::with_verdicts(vec![false, true]));
    let face = Some(detection(120.0, 130.0, 0.9));
    let (mut orch, _) = login(
        vec![face.clone(), None, face],
        SessionSettings::login(),
        callbacks.clone(),
    );
    orch.initialize().await.unwrap();

    let start = tokio::time::Instant::now();
    assert!(matches!(orch.on_tick().await, TickOutcome::Retrying { .. }));
    assert!(start.elapsed() >= Duration::from_millis(1000));

    assert_eq!(orch.on_tick().await, TickOutcome::NoFace);
    assert_eq!(orch.on_tick().await, TickOutcome::Completed);
    assert_eq!(orch.session().attempt_count(), 1);
    assert_eq!(callbacks.payloads().len(), 2);
    assert_eq!(callbacks.failure_count(), 0);

    let retry = callbacks
        .statuses()
        .into_iter()
        .find(|s| matches!(s.kind, StatusKind::Retry { .. }))
        .unwrap();
    assert_eq!(retry.message, "Face not recognized (1/3). Please try again.");
}

#[tokio::test]
async fn exhausted_session_ends_its_loop() {
    let callbacks = Arc::new(RecordingCallbacks::with_verdicts(vec![false; 3]));
    let face = Some(detection(120.0, 130.0, 0.9));
    let (mut orch, detector) = login(
        vec![face; 5],
        SessionSettings::login().without_delays(),
        callbacks.clone(),
    );
    orch.initialize().await.unwrap();

    let (ticker, ticks) = ManualTicker::new();
    for _ in 0..5 {
        ticks.tick();
    }
    let handle = orch.spawn(ticker);

    // The ticker is still alive, but the loop ends on its own
    let report = handle.wait().await.unwrap();
    assert_eq!(report.final_phase, Phase::Failed);
    assert_eq!(report.attempts, 3);
    assert!(!report.cancelled);
    assert_eq!(detector.calls(), 3);
    assert_eq!(callbacks.failure_count(), 1);
    drop(ticks);
}
