//! The policy validator (C1, spec §4.1). Run before a draft may become
//! `published`; the canonical hash is computed only after validation passes.

use crate::guard::is_well_formed;
use gate_core::PolicySpec;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One rejection reason, located by a dotted path into the spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    pub code: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code: code.to_string(),
        }
    }
}

/// Validate a [`PolicySpec`] against every rule in §4.1. Returns every
/// violation found — validation does not short-circuit on the first issue,
/// so a caller sees the whole list in one pass.
#[must_use]
pub fn validate(spec: &PolicySpec) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if spec.version.trim().is_empty() {
        issues.push(ValidationIssue::new(
            "version",
            "version must be a non-empty string",
            "INVALID_VERSION",
        ));
    }

    validate_tool_rules(spec, &mut issues);

    if let Some(state_machine) = &spec.state_machine {
        validate_state_machine(spec, state_machine, &mut issues);
    }

    if let Some(counters) = &spec.counters {
        validate_counters(counters, &mut issues);
    }

    issues
}

fn validate_tool_rules(spec: &PolicySpec, issues: &mut Vec<ValidationIssue>) {
    let mut seen = HashSet::new();
    for (index, rule) in spec.tool_rules.iter().enumerate() {
        let path = format!("toolRules[{index}]");

        if !seen.insert(rule.tool_name.clone()) {
            issues.push(ValidationIssue::new(
                format!("{path}.toolName"),
                format!("duplicate toolName '{}'", rule.tool_name),
                "DUPLICATE_TOOL_NAME",
            ));
        }

        if let Some(state_machine) = &spec.state_machine {
            if let Some(require_state) = &rule.require_state {
                if !state_machine.states.contains(require_state) {
                    issues.push(ValidationIssue::new(
                        format!("{path}.requireState"),
                        format!("requireState '{require_state}' is not a declared state"),
                        "UNDECLARED_STATE",
                    ));
                }
            }
        } else if rule.require_state.is_some() {
            issues.push(ValidationIssue::new(
                format!("{path}.requireState"),
                "requireState set but policy has no stateMachine",
                "UNDECLARED_STATE",
            ));
        }

        for regex_rule in rule
            .deny_if_regex_match
            .iter()
            .flatten()
            .chain(rule.allow_only_if_regex_match.iter().flatten())
        {
            if let Err(err) = Regex::new(&regex_rule.pattern) {
                issues.push(ValidationIssue::new(
                    format!("{path}.pattern"),
                    format!("pattern '{}' does not compile: {err}", regex_rule.pattern),
                    "INVALID_REGEX",
                ));
            }
        }
    }
}

fn validate_state_machine(
    spec: &PolicySpec,
    state_machine: &gate_core::StateMachine,
    issues: &mut Vec<ValidationIssue>,
) {
    if state_machine.states.is_empty() {
        issues.push(ValidationIssue::new(
            "stateMachine.states",
            "state set must not be empty",
            "EMPTY_STATE_SET",
        ));
    }

    let mut seen_states = HashSet::new();
    for state in &state_machine.states {
        if !seen_states.insert(state.clone()) {
            issues.push(ValidationIssue::new(
                "stateMachine.states",
                format!("duplicate state '{state}'"),
                "DUPLICATE_STATE",
            ));
        }
    }

    if !state_machine.states.contains(&state_machine.initial_state) {
        issues.push(ValidationIssue::new(
            "stateMachine.initialState",
            format!(
                "initialState '{}' is not a declared state",
                state_machine.initial_state
            ),
            "UNDECLARED_STATE",
        ));
    }

    let declared_tools: HashSet<&str> = spec
        .tool_rules
        .iter()
        .map(|r| r.tool_name.as_str())
        .collect();
    let declared_counters: HashSet<&str> = spec
        .counters
        .iter()
        .flatten()
        .map(|c| c.name.as_str())
        .collect();

    for (index, transition) in state_machine.transitions.iter().enumerate() {
        let path = format!("stateMachine.transitions[{index}]");

        if !state_machine.states.contains(&transition.from_state) {
            issues.push(ValidationIssue::new(
                format!("{path}.fromState"),
                format!("fromState '{}' is not a declared state", transition.from_state),
                "UNDECLARED_STATE",
            ));
        }
        if !state_machine.states.contains(&transition.to_state) {
            issues.push(ValidationIssue::new(
                format!("{path}.toState"),
                format!("toState '{}' is not a declared state", transition.to_state),
                "UNDECLARED_STATE",
            ));
        }
        if !declared_tools.contains(transition.triggered_by_tool.as_str()) {
            issues.push(ValidationIssue::new(
                format!("{path}.triggeredByTool"),
                format!(
                    "triggeredByTool '{}' is not a declared tool",
                    transition.triggered_by_tool
                ),
                "UNDECLARED_TOOL",
            ));
        }

        if transition.is_self_loop() && transition.guard.is_none() {
            issues.push(ValidationIssue::new(
                format!("{path}"),
                "self-loop transition requires a guard",
                "UNGUARDED_SELF_LOOP",
            ));
        }

        if let Some(guard) = &transition.guard {
            if !is_well_formed(guard) {
                issues.push(ValidationIssue::new(
                    format!("{path}.guard"),
                    format!("guard '{guard}' fails the comparison grammar"),
                    "INVALID_GUARD",
                ));
            } else if let Some(parsed) = crate::guard::parse(guard) {
                if !declared_counters.contains(parsed.counter_name.as_str()) {
                    issues.push(ValidationIssue::new(
                        format!("{path}.guard"),
                        format!("guard references undeclared counter '{}'", parsed.counter_name),
                        "UNDECLARED_COUNTER",
                    ));
                }
            }
        }

        for counter_name in transition.sets_counters.iter().flatten().map(|(k, _)| k) {
            if !declared_counters.contains(counter_name.as_str()) {
                issues.push(ValidationIssue::new(
                    format!("{path}.setsCounters"),
                    format!("setsCounters references undeclared counter '{counter_name}'"),
                    "UNDECLARED_COUNTER",
                ));
            }
        }
    }
}

fn validate_counters(counters: &[gate_core::CounterDef], issues: &mut Vec<ValidationIssue>) {
    for (index, counter) in counters.iter().enumerate() {
        let path = format!("counters[{index}]");
        if counter.scope != "session" {
            issues.push(ValidationIssue::new(
                format!("{path}.scope"),
                format!("scope must be 'session', got '{}'", counter.scope),
                "INVALID_COUNTER_SCOPE",
            ));
        }
    }
}
