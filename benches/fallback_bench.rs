use analytics_relay::gateway::classify::classify_source;
use analytics_relay::gateway::transform;
use analytics_relay::model::Family;
use analytics_relay::provider::ReportRow;
use analytics_relay::synth::SERVER;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;

const SOURCES: [(&str, &str); 8] = [
    ("google", "organic"),
    ("google", "cpc"),
    ("m.facebook.com", "referral"),
    ("t.co", "referral"),
    ("newsletter", "email"),
    ("(direct)", "(none)"),
    ("blog.example.org", "referral"),
    ("partner-feed", "(not set)"),
];

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify_source", |b| {
        b.iter(|| {
            for (source, medium) in SOURCES {
                black_box(classify_source(black_box(source), black_box(medium)));
            }
        });
    });
}

fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");
    let mut rng = StdRng::seed_from_u64(7);
    for family in Family::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(family), &family, |b, &family| {
            b.iter(|| black_box(SERVER.synthesize_with(family, &mut rng)));
        });
    }
    group.finish();
}

fn detailed_rows(n: usize) -> Vec<ReportRow> {
    (0..n)
        .map(|i| {
            let (source, medium) = SOURCES[i % SOURCES.len()];
            ReportRow {
                dimension_values: vec![
                    format!("{source}{}", i % 40),
                    medium.to_string(),
                    "(not set)".to_string(),
                ],
                metric_values: vec![(i * 3).to_string(), i.to_string()],
            }
        })
        .collect()
}

fn bench_detailed_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("detailed_sources");
    for size in [20_usize, 200, 2_000] {
        let rows = detailed_rows(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| black_box(transform::detailed_sources(rows)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_synthesize, bench_detailed_transform);
criterion_main!(benches);
