//! Fusion policy benchmarks
//!
//! Run with: cargo bench -p civiclens-policy

use civiclens_core::{FusionInputs, Prediction};
use civiclens_policy::{area_bucket, FallbackGenerator, FusionPolicy};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn p(label: &str, confidence: f32) -> Option<Prediction> {
    Some(Prediction::new(label, confidence))
}

fn benchmark_fusion(c: &mut Criterion) {
    let policy = FusionPolicy::default();
    let fallback = FallbackGenerator::seeded(0);

    let cases = vec![
        ("garbage_override", FusionInputs {
            general: p("streetlight", 0.9),
            common: p("pothole", 0.8),
            garbage: p("garbage", 0.9),
        }),
        ("streetlight_high", FusionInputs {
            general: p("streetlight", 0.85),
            common: p("pothole", 0.2),
            garbage: None,
        }),
        ("deepest_rule", FusionInputs {
            general: p("water_leak", 0.45),
            common: p("other", 0.55),
            garbage: p("not_garbage", 0.9),
        }),
        ("fallback", FusionInputs::default()),
    ];

    let mut group = c.benchmark_group("Fusion_Policy");
    group.sample_size(200);

    for (name, inputs) in &cases {
        group.bench_with_input(BenchmarkId::new("evaluate", name), inputs, |b, inputs| {
            b.iter(|| policy.evaluate(black_box(inputs), &fallback))
        });
    }

    group.finish();
}

fn benchmark_area_bucket(c: &mut Criterion) {
    c.bench_function("area_bucket", |b| {
        b.iter(|| area_bucket(black_box(40.7128), black_box(-74.0060)))
    });
}

criterion_group!(benches, benchmark_fusion, benchmark_area_bucket);
criterion_main!(benches);
