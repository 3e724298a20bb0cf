//! Benchmarks for the request-validation and result-decoding hot path.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use prognos::decode::decode;
use prognos::request::PredictionRequest;

fn bench_decode(c: &mut Criterion) {
    let payload = br#"{"disease":"Influenza","confidence":0.9231}"#;
    c.bench_function("decode_result", |b| {
        b.iter(|| decode(black_box(payload)).unwrap())
    });
}

fn bench_validate(c: &mut Criterion) {
    let symptoms: Vec<String> = (0..16).map(|i| format!("symptom_{i}")).collect();
    let body = serde_json::to_vec(&serde_json::json!({ "symptoms": symptoms })).unwrap();
    c.bench_function("validate_request", |b| {
        b.iter(|| PredictionRequest::parse(black_box(&body)).unwrap())
    });
}

fn bench_worker_arg(c: &mut Criterion) {
    let symptoms: Vec<String> = (0..16).map(|i| format!("symptom_{i}")).collect();
    let body = serde_json::to_vec(&serde_json::json!({ "symptoms": symptoms })).unwrap();
    let request = PredictionRequest::parse(&body).unwrap();
    c.bench_function("encode_worker_arg", |b| {
        b.iter(|| black_box(&request).worker_arg())
    });
}

criterion_group!(benches, bench_decode, bench_validate, bench_worker_arg);
criterion_main!(benches);
