//! Property-based tests for capture sessions
//!
//! These tests verify the buffering and gating invariants over arbitrary
//! detection sequences, using proptest for input generation and shrinking.

use facegate::orchestrator::{CaptureOrchestrator, TickOutcome};
use facegate::testing::{RecordingCallbacks, ScriptedDetector, SyntheticSource};
use facegate::{
    BoundingBox, CaptureSession, DetectionResult, Point, QualityGate, Sample, SessionSettings,
    Transition, Variant,
};
use proptest::prelude::*;
use std::sync::Arc;

fn arb_detection() -> impl Strategy<Value = Option<DetectionResult>> {
    prop::option::weighted(
        0.8,
        (0.0f32..300.0, 0.0f32..300.0, 0.0f32..1.0).prop_map(|(w, h, c)| DetectionResult {
            bounding_box: BoundingBox::new(w, h),
            confidence_score: c,
            descriptor: vec![w, h, c],
            landmarks: vec![Point::new(w / 2.0, h / 2.0)],
        }),
    )
}

fn run_script(
    variant: Variant,
    script: Vec<Option<DetectionResult>>,
) -> (Vec<TickOutcome>, Arc<RecordingCallbacks>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async move {
        let ticks = script.len();
        let settings = match variant {
            Variant::Registration => SessionSettings::registration(),
            Variant::Login => SessionSettings::login(),
        }
        .without_delays();
        let callbacks = Arc::new(RecordingCallbacks::new());
        let mut orch = CaptureOrchestrator::new(
            Arc::new(SyntheticSource::new()),
            Arc::new(ScriptedDetector::new(script)),
            settings,
            callbacks.clone(),
        );
        orch.initialize().await.unwrap();

        let mut outcomes = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            outcomes.push(orch.on_tick().await);
        }
        (outcomes, callbacks)
    })
}

fn descriptor_key(descriptor: &[f32]) -> Vec<u32> {
    descriptor.iter().map(|v| v.to_bits()).collect()
}

proptest! {
    /// INVARIANT: the buffer never holds more than the required samples
    #[test]
    fn sample_count_never_exceeds_required(
        required in 1usize..6,
        accepted in 0usize..12,
    ) {
        let mut session = CaptureSession::new(Variant::Registration, required, None)
            .apply(Transition::InitSucceeded)
            .unwrap();
        let sample = Sample::from_detection(&DetectionResult {
            bounding_box: BoundingBox::new(150.0, 150.0),
            confidence_score: 0.9,
            descriptor: vec![1.0],
            landmarks: vec![],
        });

        for _ in 0..accepted {
            session = match session.clone().apply(Transition::SampleAccepted(sample.clone())) {
                Ok(next) => next,
                Err(_) => session,
            };
            prop_assert!(session.sample_count() <= required);
        }
        prop_assert_eq!(session.sample_count(), accepted.min(required));
    }

    /// INVARIANT: every submitted descriptor came from a detection the gate accepts
    #[test]
    fn submitted_samples_pass_the_gate(
        script in prop::collection::vec(arb_detection(), 1..20),
    ) {
        let gate = QualityGate::registration();
        let passing: Vec<Vec<u32>> = script
            .iter()
            .flatten()
            .filter(|d| d.is_usable() && gate.accept(d))
            .map(|d| descriptor_key(&d.descriptor))
            .collect();

        let (outcomes, callbacks) = run_script(Variant::Registration, script);

        for payload in callbacks.payloads() {
            let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
            for descriptor in json["descriptors"].as_array().unwrap() {
                let values: Vec<f32> = serde_json::from_value(descriptor.clone()).unwrap();
                prop_assert!(passing.contains(&descriptor_key(&values)));
            }
        }

        let completed = outcomes.iter().filter(|o| **o == TickOutcome::Completed).count();
        prop_assert_eq!(completed, usize::from(passing.len() >= 3));
    }

    /// INVARIANT: a payload is submitted exactly when the buffer fills
    #[test]
    fn finalize_happens_once_when_full(
        script in prop::collection::vec(arb_detection(), 1..20),
    ) {
        let gate = QualityGate::login();
        let first_pass = script
            .iter()
            .position(|d| d.as_ref().map_or(false, |d| d.is_usable() && gate.accept(d)));

        let (outcomes, callbacks) = run_script(Variant::Login, script);

        match first_pass {
            Some(index) => {
                prop_assert_eq!(&outcomes[index], &TickOutcome::Completed);
                prop_assert_eq!(callbacks.payloads().len(), 1);
                for outcome in &outcomes[index + 1..] {
                    let skipped = matches!(outcome, TickOutcome::Skipped(_));
                    prop_assert!(skipped);
                }
            }
            None => prop_assert!(callbacks.payloads().is_empty()),
        }
    }
}
