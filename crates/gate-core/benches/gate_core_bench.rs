//! Benchmarks for canonical hashing, the hot path shared by policy publish
//! and every audit write.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gate_core::{hash_canonical_value, ActionType, Effect, PolicySpec, ToolRule};

fn sample_spec(rule_count: usize) -> PolicySpec {
    let tool_rules = (0..rule_count)
        .map(|i| ToolRule {
            tool_name: format!("tool_{i}"),
            effect: Effect::Allow,
            action_type: Some(ActionType::Read),
            max_calls_per_session: Some(10),
            cooldown_ms: None,
            require_state: None,
            require_previous_tool_calls: None,
            require_fields: None,
            deny_if_fields_present: None,
            deny_if_regex_match: None,
            allow_only_if_regex_match: None,
        })
        .collect();
    PolicySpec {
        version: "1".to_string(),
        default_decision: Effect::Deny,
        tool_rules,
        state_machine: None,
        counters: None,
    }
}

fn benchmark_canonical_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical_hash");
    for size in [1, 10, 100].iter() {
        let spec = sample_spec(*size);
        let value = serde_json::to_value(&spec).unwrap();
        group.bench_with_input(BenchmarkId::new("tool_rules", size), &value, |b, v| {
            b.iter(|| black_box(hash_canonical_value(v)));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_canonical_hash);
criterion_main!(benches);
