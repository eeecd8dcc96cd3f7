use audit_log::redact;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn sample_payload() -> serde_json::Value {
    json!({
        "orderId": "AB-1234",
        "amount": 4999,
        "customer": {
            "email": "person@example.com",
            "cardNumber": "4111 1111 1111 1111",
            "ssn": "123-45-6789",
        },
        "metadata": {
            "authorization": "Bearer abc.def.ghi",
            "notes": ["fine", "also fine", "token abcdef"],
        }
    })
}

fn benchmark_redact(c: &mut Criterion) {
    let payload = sample_payload();
    c.bench_function("redact_nested_payload", |b| {
        b.iter(|| black_box(redact(&payload)));
    });
}

criterion_group!(benches, benchmark_redact);
criterion_main!(benches);
