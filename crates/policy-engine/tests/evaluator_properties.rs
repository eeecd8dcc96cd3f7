//! Property-based coverage of the evaluator's quantified invariants (spec
//! §8): monotone call counts and state closure under arbitrary call
//! sequences.

use gate_core::{CallRequest, Effect, PolicySpec, SessionSnapshot, ToolRule};
use policy_engine::evaluate;
use proptest::prelude::*;

fn capped_policy(max_calls: u64) -> PolicySpec {
    PolicySpec {
        version: "1".to_string(),
        default_decision: Effect::Deny,
        tool_rules: vec![ToolRule {
            tool_name: "refund_payment".to_string(),
            effect: Effect::Allow,
            action_type: None,
            max_calls_per_session: Some(max_calls),
            cooldown_ms: None,
            require_state: None,
            require_previous_tool_calls: None,
            require_fields: None,
            deny_if_fields_present: None,
            deny_if_regex_match: None,
            allow_only_if_regex_match: None,
        }],
        state_machine: None,
        counters: None,
    }
}

proptest! {
    #[test]
    fn call_count_never_exceeds_the_ceiling(max_calls in 0u64..8, attempts in 0usize..20) {
        let policy = capped_policy(max_calls);
        let mut snapshot = SessionSnapshot::default();

        for i in 0..attempts {
            let request = CallRequest {
                session_id: "s1".to_string(),
                agent_id: "agent-1".to_string(),
                tool_name: "refund_payment".to_string(),
                action_type: None,
                payload: serde_json::json!({}),
                metadata: None,
            };
            let outcome = evaluate(&policy, &snapshot, &request, i as i64);
            snapshot.current_state = outcome.new_state;
            snapshot.counters = outcome.new_counters;
            snapshot.tool_call_counts = outcome.new_tool_call_counts;
            if outcome.allowed {
                snapshot.tool_calls_history.push("refund_payment".to_string());
            }
            let count = snapshot.tool_call_counts.get("refund_payment").copied().unwrap_or(0);
            prop_assert!(count <= max_calls);
        }
    }

    #[test]
    fn allowed_count_increases_by_exactly_one_on_allowed_calls(attempts in 1usize..15) {
        let policy = capped_policy(1000);
        let mut snapshot = SessionSnapshot::default();
        let mut previous_count = 0u64;

        for i in 0..attempts {
            let request = CallRequest {
                session_id: "s1".to_string(),
                agent_id: "agent-1".to_string(),
                tool_name: "refund_payment".to_string(),
                action_type: None,
                payload: serde_json::json!({}),
                metadata: None,
            };
            let outcome = evaluate(&policy, &snapshot, &request, i as i64);
            let new_count = outcome
                .new_tool_call_counts
                .get("refund_payment")
                .copied()
                .unwrap_or(0);
            if outcome.allowed {
                prop_assert_eq!(new_count, previous_count + 1);
            } else {
                prop_assert_eq!(new_count, previous_count);
            }
            previous_count = new_count;
            snapshot.current_state = outcome.new_state;
            snapshot.counters = outcome.new_counters;
            snapshot.tool_call_counts = outcome.new_tool_call_counts;
        }
    }
}
