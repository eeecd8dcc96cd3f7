//! The deterministic evaluator (C2, spec §4.2).
//!
//! `Evaluator::evaluate` is the pure decision function: given the same
//! `(policy, snapshot, request, nowMs)` it always returns the same output.
//! It performs no I/O and reads no wall clock — `now_ms` is supplied by the
//! caller. The only mutable state kept here is a compiled-regex cache, which
//! affects performance, not the result: a cache miss compiles and the
//! decision is identical either way.

use crate::jsonpath;
use crate::{guard, validate};
use dashmap::DashMap;
use gate_core::{
    ActionType, CallRequest, DecisionReason, EvaluationOutcome, PolicySpec, ReasonCode,
    SessionSnapshot,
};
use regex::Regex;
use std::sync::Arc;
use tracing::instrument;

/// Lock-free cache of compiled regexes, keyed by pattern source. Policies
/// are immutable once published, so a pattern compiles to the same matcher
/// for the lifetime of the process; this avoids recompiling the same
/// `denyIfRegexMatch`/`allowOnlyIfRegexMatch` pattern on every call.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: DashMap<String, Option<Arc<Regex>>>,
}

impl RegexCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            compiled: DashMap::new(),
        }
    }

    /// `None` means the pattern does not compile; per §4.2 step 10 this is
    /// treated as a silent skip, never as an evaluator failure.
    fn get(&self, pattern: &str) -> Option<Arc<Regex>> {
        if let Some(entry) = self.compiled.get(pattern) {
            return entry.clone();
        }
        let compiled = Regex::new(pattern).ok().map(Arc::new);
        self.compiled.insert(pattern.to_string(), compiled.clone());
        compiled
    }
}

/// The evaluator. Cheap to clone (the cache is the only field, shared via
/// `Arc` internally through `DashMap`'s own sharding).
#[derive(Debug, Default)]
pub struct Evaluator {
    regex_cache: RegexCache,
}

impl Evaluator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regex_cache: RegexCache::new(),
        }
    }

    /// Run the ordered check pipeline of spec §4.2 against one call request.
    #[instrument(skip(self, policy, snapshot, request), fields(tool_name = %request.tool_name))]
    pub fn evaluate(
        &self,
        policy: &PolicySpec,
        snapshot: &SessionSnapshot,
        request: &CallRequest,
        now_ms: i64,
    ) -> EvaluationOutcome {
        let mut reasons = Vec::new();
        let mut error_code: Option<ReasonCode> = None;
        let mut allowed = true;

        // Step 1: unknown tool (terminal).
        let Some(rule) = policy.rule_for(&request.tool_name) else {
            return unknown_tool_outcome(policy, snapshot, request);
        };

        // Step 2: explicit deny (terminal).
        if rule.effect == gate_core::Effect::Deny {
            record(
                &mut reasons,
                &mut error_code,
                &mut allowed,
                ReasonCode::ToolExplicitlyDenied,
                format!("tool '{}' is explicitly denied", request.tool_name),
                Some(&request.tool_name),
            );
            return finalize(snapshot, request, allowed, error_code, reasons, None);
        }

        // Step 3: side-effect gate (terminal).
        let effective_action_type = request.action_type.or(rule.action_type);
        if matches!(
            effective_action_type,
            Some(ActionType::Write) | Some(ActionType::SideEffect)
        ) && rule.effect != gate_core::Effect::Allow
        {
            record(
                &mut reasons,
                &mut error_code,
                &mut allowed,
                ReasonCode::SideEffectNotAllowed,
                format!("tool '{}' is not allowed to cause side effects", request.tool_name),
                Some(&request.tool_name),
            );
            return finalize(snapshot, request, allowed, error_code, reasons, None);
        }

        // Step 4: required state (non-terminal).
        if let Some(require_state) = &rule.require_state {
            if require_state != &snapshot.current_state {
                record(
                    &mut reasons,
                    &mut error_code,
                    &mut allowed,
                    ReasonCode::RequiredStateNotMet,
                    format!(
                        "tool '{}' requires state '{require_state}', session is in '{}'",
                        request.tool_name, snapshot.current_state
                    ),
                    Some(&request.tool_name),
                );
            }
        }

        // Step 5: required previous tools (non-terminal).
        for required_tool in rule.require_previous_tool_calls.iter().flatten() {
            if !snapshot.tool_calls_history.contains(required_tool) {
                record(
                    &mut reasons,
                    &mut error_code,
                    &mut allowed,
                    ReasonCode::RequiredToolsNotCalled,
                    format!("required prior tool call '{required_tool}' has not occurred"),
                    Some(required_tool),
                );
            }
        }

        // Step 6: max calls per session.
        if let Some(max_calls) = rule.max_calls_per_session {
            let current_count = snapshot
                .tool_call_counts
                .get(&request.tool_name)
                .copied()
                .unwrap_or(0);
            if current_count >= max_calls {
                record(
                    &mut reasons,
                    &mut error_code,
                    &mut allowed,
                    ReasonCode::MaxCallsExceeded,
                    format!(
                        "tool '{}' has already been called {current_count} time(s), limit is {max_calls}",
                        request.tool_name
                    ),
                    Some(&request.tool_name),
                );
            }
        }

        // Step 7: cooldown.
        if let Some(cooldown_ms) = rule.cooldown_ms {
            if let Some(last_time) = snapshot.last_tool_call_times.get(&request.tool_name) {
                let elapsed = now_ms - last_time;
                if elapsed < cooldown_ms as i64 {
                    let remaining = cooldown_ms as i64 - elapsed;
                    record(
                        &mut reasons,
                        &mut error_code,
                        &mut allowed,
                        ReasonCode::CooldownActive,
                        format!("tool '{}' is on cooldown for {remaining} more ms", request.tool_name),
                        Some(&request.tool_name),
                    );
                }
            }
        }

        // Step 8: required fields.
        for field_path in rule.require_fields.iter().flatten() {
            if jsonpath::resolve(&request.payload, field_path).is_none() {
                record(
                    &mut reasons,
                    &mut error_code,
                    &mut allowed,
                    ReasonCode::RequiredFieldMissing,
                    format!("required field '{field_path}' is missing"),
                    Some(field_path),
                );
            }
        }

        // Step 9: forbidden fields.
        for field_path in rule.deny_if_fields_present.iter().flatten() {
            if jsonpath::resolve(&request.payload, field_path).is_some() {
                record(
                    &mut reasons,
                    &mut error_code,
                    &mut allowed,
                    ReasonCode::ForbiddenFieldPresent,
                    format!("forbidden field '{field_path}' is present"),
                    Some(field_path),
                );
            }
        }

        // Step 10: deny-if-regex.
        for constraint in rule.deny_if_regex_match.iter().flatten() {
            let Some(compiled) = self.regex_cache.get(&constraint.pattern) else {
                continue;
            };
            if let Some(value) = jsonpath::resolve(&request.payload, &constraint.json_path) {
                if let Some(s) = value.as_str() {
                    if compiled.is_match(s) {
                        record(
                            &mut reasons,
                            &mut error_code,
                            &mut allowed,
                            ReasonCode::RegexMatchDenied,
                            format!(
                                "field '{}' matches forbidden pattern '{}'",
                                constraint.json_path, constraint.pattern
                            ),
                            Some(&constraint.json_path),
                        );
                    }
                }
            }
        }

        // Step 11: allow-only-if-regex.
        for constraint in rule.allow_only_if_regex_match.iter().flatten() {
            let matched = jsonpath::resolve(&request.payload, &constraint.json_path)
                .and_then(|v| v.as_str())
                .and_then(|s| {
                    self.regex_cache
                        .get(&constraint.pattern)
                        .map(|re| re.is_match(s))
                })
                .unwrap_or(false);
            if !matched {
                record(
                    &mut reasons,
                    &mut error_code,
                    &mut allowed,
                    ReasonCode::RegexMatchRequired,
                    format!(
                        "field '{}' must match required pattern '{}'",
                        constraint.json_path, constraint.pattern
                    ),
                    Some(&constraint.json_path),
                );
            }
        }

        // Step 12: state-machine transition.
        let mut working_counters = snapshot.counters.clone();
        let mut new_state = snapshot.current_state.clone();

        if allowed {
            if let Some(state_machine) = &policy.state_machine {
                if let Some(transition) = state_machine.transitions.iter().find(|t| {
                    t.from_state == snapshot.current_state && t.triggered_by_tool == request.tool_name
                }) {
                    for required_tool in transition.requires_tools_called_before.iter().flatten() {
                        if !snapshot.tool_calls_history.contains(required_tool) {
                            record(
                                &mut reasons,
                                &mut error_code,
                                &mut allowed,
                                ReasonCode::RequiredToolsNotCalled,
                                format!(
                                    "transition to '{}' requires prior tool call '{required_tool}'",
                                    transition.to_state
                                ),
                                Some(required_tool),
                            );
                        }
                    }

                    if allowed {
                        let guard_ok = transition
                            .guard
                            .as_ref()
                            .map_or(true, |expr| guard::evaluate(expr, &working_counters));
                        if !guard_ok {
                            record(
                                &mut reasons,
                                &mut error_code,
                                &mut allowed,
                                ReasonCode::GuardConditionFailed,
                                format!(
                                    "guard '{}' failed for transition to '{}'",
                                    transition.guard.as_deref().unwrap_or(""),
                                    transition.to_state
                                ),
                                Some(&request.tool_name),
                            );
                        }
                    }

                    if allowed {
                        new_state = transition.to_state.clone();
                        for (counter_name, delta) in transition.sets_counters.iter().flatten() {
                            *working_counters.entry(counter_name.clone()).or_insert(0) += delta;
                        }
                        reasons.push(DecisionReason::new(
                            ReasonCode::StateTransition,
                            format!(
                                "transitioned from '{}' to '{}' on '{}'",
                                snapshot.current_state, transition.to_state, request.tool_name
                            ),
                        ));
                    }
                }
            }
        }

        // Step 13: counter ceiling.
        if allowed {
            for counter_def in policy.counters.iter().flatten() {
                if let Some(max_value) = counter_def.max_value {
                    let value = working_counters.get(&counter_def.name).copied().unwrap_or(0);
                    if value > max_value {
                        record(
                            &mut reasons,
                            &mut error_code,
                            &mut allowed,
                            ReasonCode::CounterLimitExceeded,
                            format!(
                                "counter '{}' value {value} exceeds max {max_value}",
                                counter_def.name
                            ),
                            Some(&counter_def.name),
                        );
                    }
                }
            }
        }

        finalize(
            snapshot,
            request,
            allowed,
            error_code,
            reasons,
            if allowed {
                Some((new_state, working_counters))
            } else {
                None
            },
        )
    }
}

/// Append a reason and flip `allowed`/`error_code` if this is the first
/// denying check to fire (§4.2: "the first denying check's code").
fn record(
    reasons: &mut Vec<DecisionReason>,
    error_code: &mut Option<ReasonCode>,
    allowed: &mut bool,
    code: ReasonCode,
    message: String,
    rule_ref: Option<&str>,
) {
    if error_code.is_none() {
        *error_code = Some(code);
    }
    *allowed = false;
    let mut reason = DecisionReason::new(code, message);
    if let Some(rule_ref) = rule_ref {
        reason = reason.with_rule_ref(rule_ref);
    }
    reasons.push(reason);
}

/// Step 1's terminal path: no matching rule.
fn unknown_tool_outcome(
    policy: &PolicySpec,
    snapshot: &SessionSnapshot,
    request: &CallRequest,
) -> EvaluationOutcome {
    if policy.default_decision == gate_core::Effect::Deny {
        EvaluationOutcome {
            allowed: false,
            error_code: Some(ReasonCode::UnknownToolDenied),
            reasons: vec![DecisionReason::new(
                ReasonCode::UnknownToolDenied,
                format!("no rule declared for tool '{}'", request.tool_name),
            )
            .with_rule_ref(&request.tool_name)],
            new_state: snapshot.current_state.clone(),
            new_counters: snapshot.counters.clone(),
            new_tool_call_counts: snapshot.tool_call_counts.clone(),
        }
    } else {
        EvaluationOutcome {
            allowed: true,
            error_code: None,
            reasons: vec![DecisionReason::new(
                ReasonCode::Allowed,
                format!(
                    "no rule declared for tool '{}'; default decision is allow",
                    request.tool_name
                ),
            )],
            new_state: snapshot.current_state.clone(),
            new_counters: snapshot.counters.clone(),
            new_tool_call_counts: snapshot.tool_call_counts.clone(),
        }
    }
}

/// Finalization: increment the call counter on an allowed outcome, and
/// guarantee a non-empty reason chain.
fn finalize(
    snapshot: &SessionSnapshot,
    request: &CallRequest,
    allowed: bool,
    error_code: Option<ReasonCode>,
    mut reasons: Vec<DecisionReason>,
    transitioned_state: Option<(String, std::collections::HashMap<String, i64>)>,
) -> EvaluationOutcome {
    let (new_state, new_counters) = transitioned_state
        .unwrap_or_else(|| (snapshot.current_state.clone(), snapshot.counters.clone()));

    let mut new_tool_call_counts = snapshot.tool_call_counts.clone();
    if allowed {
        *new_tool_call_counts.entry(request.tool_name.clone()).or_insert(0) += 1;
    }

    if reasons.is_empty() {
        reasons.push(DecisionReason::new(ReasonCode::Allowed, "call allowed"));
    }

    EvaluationOutcome {
        allowed,
        error_code,
        reasons,
        new_state,
        new_counters,
        new_tool_call_counts,
    }
}

/// Stateless convenience wrapper for callers that do not need to keep a
/// regex cache across calls (tests, one-off evaluations).
#[must_use]
pub fn evaluate(
    policy: &PolicySpec,
    snapshot: &SessionSnapshot,
    request: &CallRequest,
    now_ms: i64,
) -> EvaluationOutcome {
    Evaluator::new().evaluate(policy, snapshot, request, now_ms)
}

/// Re-exported for callers that want to validate before evaluating.
pub use validate::{validate as validate_policy, ValidationIssue};
