use criterion::{black_box, criterion_group, criterion_main, Criterion};
use policy_registry::{parse_version, validate_policy_name};

fn benchmark_validate_policy_name(c: &mut Criterion) {
    c.bench_function("validate_policy_name_well_formed", |b| {
        b.iter(|| black_box(validate_policy_name("refund-flow")));
    });
}

fn benchmark_parse_version(c: &mut Criterion) {
    c.bench_function("parse_version_well_formed", |b| {
        b.iter(|| black_box(parse_version("3")));
    });
}

criterion_group!(benches, benchmark_validate_policy_name, benchmark_parse_version);
criterion_main!(benches);
