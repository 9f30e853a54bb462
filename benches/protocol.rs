//! Protocol codec benchmark suite.
//!
//! Benchmarks the per-frame work on the hot path:
//! - Encoding typed commands into request frames
//! - Parsing result frames of growing snapshot sizes
//!
//! Run with: cargo bench --bench protocol
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};

use hass_bridge::protocol::{IncomingMessage, Request};
use hass_bridge::{Command, MessageId, ServiceCall, Target};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const SNAPSHOT_SIZES: &[usize] = &[10, 100, 1_000];

// ============================================================================
// Benchmark: Request Encoding
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    group.bench_function("get_states", |b| {
        b.iter(|| {
            let request = Request::from_command(MessageId::new(42), Command::GetStates)
                .and_then(|r| r.to_frame());
            black_box(request)
        });
    });

    let call = ServiceCall::new("light", "turn_on")
        .with_data(json!({"brightness": 180, "transition": 2}))
        .with_target(Target::entities(["light.kitchen", "light.hallway"]));

    group.bench_function("call_service", |b| {
        b.iter(|| {
            let command = Command::CallService {
                domain: call.domain.clone(),
                service: call.service.clone(),
                service_data: call.service_data.clone(),
                target: call.target.clone(),
                return_response: None,
            };
            black_box(Request::from_command(MessageId::new(7), command).and_then(|r| r.to_frame()))
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark: Result Parsing
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_result");

    for &size in SNAPSHOT_SIZES {
        let frame = snapshot_frame(size);
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("get_states", size), &frame, |b, frame| {
            b.iter(|| black_box(IncomingMessage::parse(frame)));
        });
    }

    let pong = json!({"id": 9, "type": "pong"}).to_string();
    group.bench_function("pong", |b| {
        b.iter(|| black_box(IncomingMessage::parse(&pong)));
    });

    group.finish();
}

// ============================================================================
// Helper Functions
// ============================================================================

fn snapshot_frame(size: usize) -> String {
    let states: Vec<Value> = (0..size)
        .map(|i| {
            json!({
                "entity_id": format!("sensor.thermometer_{i}"),
                "state": format!("{}.{}", 20 + i % 5, i % 10),
                "attributes": {
                    "unit_of_measurement": "°C",
                    "friendly_name": format!("Thermometer {i}"),
                    "device_class": "temperature"
                },
                "last_changed": "2024-05-01T10:00:00+00:00",
                "last_updated": "2024-05-01T10:00:00+00:00",
                "context": {"id": "01HX", "parent_id": null, "user_id": null}
            })
        })
        .collect();

    json!({"id": 1, "type": "result", "success": true, "result": states}).to_string()
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_encode, bench_parse);
criterion_main!(benches);
