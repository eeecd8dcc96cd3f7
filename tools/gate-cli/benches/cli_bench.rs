use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gate_cli::env_mismatch_warning;
use serde_json::json;

fn benchmark_env_mismatch_warning(c: &mut Criterion) {
    let body = json!({ "env_id": "prod" });
    c.bench_function("env_mismatch_warning_matching", |b| {
        b.iter(|| black_box(env_mismatch_warning(&body, "prod", "s1")));
    });
}

criterion_group!(benches, benchmark_env_mismatch_warning);
criterion_main!(benches);
