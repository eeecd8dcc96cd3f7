//! Benchmarks for the hot path of the decision endpoint: evaluating one
//! call request against a policy with a state machine and a handful of
//! field/regex constraints.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gate_core::{ActionType, CallRequest, Effect, PolicySpec, SessionSnapshot, StateMachine, ToolRule, Transition};
use policy_engine::Evaluator;

fn sample_policy() -> PolicySpec {
    PolicySpec {
        version: "1".to_string(),
        default_decision: Effect::Deny,
        tool_rules: vec![
            ToolRule {
                tool_name: "verify_identity".to_string(),
                effect: Effect::Allow,
                action_type: Some(ActionType::Write),
                max_calls_per_session: None,
                cooldown_ms: None,
                require_state: None,
                require_previous_tool_calls: None,
                require_fields: None,
                deny_if_fields_present: None,
                deny_if_regex_match: None,
                allow_only_if_regex_match: None,
            },
            ToolRule {
                tool_name: "refund_payment".to_string(),
                effect: Effect::Allow,
                action_type: Some(ActionType::SideEffect),
                max_calls_per_session: Some(1),
                cooldown_ms: Some(1_000),
                require_state: Some("verified".to_string()),
                require_previous_tool_calls: Some(vec!["verify_identity".to_string()]),
                require_fields: Some(vec!["orderId".to_string(), "amount".to_string()]),
                deny_if_fields_present: None,
                deny_if_regex_match: Some(vec![gate_core::FieldRegexRule {
                    json_path: "orderId".to_string(),
                    pattern: r"^[A-Z]{2}-\d+$".to_string(),
                }]),
                allow_only_if_regex_match: None,
            },
        ],
        state_machine: Some(StateMachine {
            states: vec!["initial".to_string(), "verified".to_string(), "refund_issued".to_string()],
            initial_state: "initial".to_string(),
            transitions: vec![
                Transition {
                    from_state: "initial".to_string(),
                    to_state: "verified".to_string(),
                    triggered_by_tool: "verify_identity".to_string(),
                    requires_tools_called_before: None,
                    guard: None,
                    sets_counters: None,
                },
                Transition {
                    from_state: "verified".to_string(),
                    to_state: "refund_issued".to_string(),
                    triggered_by_tool: "refund_payment".to_string(),
                    requires_tools_called_before: None,
                    guard: None,
                    sets_counters: None,
                },
            ],
        }),
        counters: None,
    }
}

fn benchmark_evaluate(c: &mut Criterion) {
    let evaluator = Evaluator::new();
    let policy = sample_policy();
    let mut snapshot = SessionSnapshot::default();
    snapshot.current_state = "verified".to_string();
    snapshot.tool_calls_history.push("verify_identity".to_string());
    let request = CallRequest {
        session_id: "s1".to_string(),
        agent_id: "agent-1".to_string(),
        tool_name: "refund_payment".to_string(),
        action_type: None,
        payload: serde_json::json!({"orderId": "AB-1234", "amount": 100}),
        metadata: None,
    };

    c.bench_function("evaluate_refund_with_regex_and_transition", |b| {
        b.iter(|| black_box(evaluator.evaluate(&policy, &snapshot, &request, 0)));
    });
}

criterion_group!(benches, benchmark_evaluate);
criterion_main!(benches);
