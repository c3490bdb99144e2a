//! Performance benchmarks for FaceGate session hot paths
//!
//! Run with: cargo bench
//!
//! Measures the per-tick work that does not depend on the detector: quality
//! gating, session transitions and payload serialization.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use facegate::buffer::SampleBuffer;
use facegate::finalize::Payload;
use facegate::testing::detection;
use facegate::{CaptureSession, QualityGate, Sample, Transition, Variant};

fn bench_quality_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("Quality Gate");
    let gate = QualityGate::registration();

    for (name, hit) in [
        ("accept", detection(150.0, 160.0, 0.95)),
        ("too_small", detection(50.0, 50.0, 0.95)),
        ("low_confidence", detection(150.0, 160.0, 0.5)),
    ] {
        group.bench_with_input(BenchmarkId::new("evaluate", name), &hit, |b, hit| {
            b.iter(|| gate.evaluate(black_box(hit)))
        });
    }

    group.finish();
}

fn bench_session_transitions(c: &mut Criterion) {
    let mut group = c.benchmark_group("Session Transitions");
    let sample = Sample::from_detection(&detection(150.0, 160.0, 0.95));

    group.bench_function("registration_fill", |b| {
        b.iter(|| {
            let mut session = CaptureSession::new(Variant::Registration, 3, None)
                .apply(Transition::InitSucceeded)
                .unwrap();
            for _ in 0..3 {
                session = session
                    .apply(Transition::SampleAccepted(black_box(sample.clone())))
                    .unwrap();
            }
            session.apply(Transition::FinalizeSucceeded).unwrap()
        })
    });

    group.bench_function("miss", |b| {
        let session = CaptureSession::new(Variant::Login, 1, Some(3))
            .apply(Transition::InitSucceeded)
            .unwrap();
        b.iter(|| session.clone().apply(black_box(Transition::NoFace)).unwrap())
    });

    group.finish();
}

fn bench_payload_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("Payload Serialization");

    for (variant, count) in [(Variant::Login, 1usize), (Variant::Registration, 3)] {
        let mut buffer = SampleBuffer::new(count);
        for _ in 0..count {
            buffer
                .append(Sample::from_detection(&detection(150.0, 160.0, 0.95)))
                .unwrap();
        }

        group.bench_with_input(
            BenchmarkId::new("assemble_to_json", variant.as_str()),
            &buffer,
            |b, buffer| {
                b.iter(|| {
                    Payload::assemble(variant, black_box(buffer))
                        .and_then(|payload| payload.to_json())
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_quality_gate,
    bench_session_transitions,
    bench_payload_serialization,
);

criterion_main!(benches);
