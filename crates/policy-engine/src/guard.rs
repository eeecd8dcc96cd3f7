//! The state-transition guard grammar: a single comparison against a
//! counter (spec §4.2 Guard grammar).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static GUARD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(<=|<|>=|>|==|!=)\s*(-?\d+)\s*$")
        .expect("guard grammar is a fixed, known-valid pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Op {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(Op::Lt),
            "<=" => Some(Op::Le),
            ">" => Some(Op::Gt),
            ">=" => Some(Op::Ge),
            "==" => Some(Op::Eq),
            "!=" => Some(Op::Ne),
            _ => None,
        }
    }

    fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Op::Lt => lhs < rhs,
            Op::Le => lhs <= rhs,
            Op::Gt => lhs > rhs,
            Op::Ge => lhs >= rhs,
            Op::Eq => lhs == rhs,
            Op::Ne => lhs != rhs,
        }
    }
}

/// A parsed guard: `counterName OP integer`.
#[derive(Debug, Clone)]
pub struct Guard {
    pub counter_name: String,
    pub op: Op,
    pub operand: i64,
}

/// Parse a guard expression. `None` means the expression is syntactically
/// invalid; the validator (§4.1) is responsible for rejecting such policies
/// before publish, so the evaluator only needs a safe fallback.
#[must_use]
pub fn parse(expr: &str) -> Option<Guard> {
    let captures = GUARD_PATTERN.captures(expr)?;
    let counter_name = captures.get(1)?.as_str().to_string();
    let op = Op::from_token(captures.get(2)?.as_str())?;
    let operand: i64 = captures.get(3)?.as_str().parse().ok()?;
    Some(Guard {
        counter_name,
        op,
        operand,
    })
}

/// Evaluate a guard expression against the working counters. A missing
/// counter reads as zero; a syntactically invalid expression evaluates to
/// `false` (the policy should never have validated in the first place).
#[must_use]
pub fn evaluate(expr: &str, counters: &HashMap<String, i64>) -> bool {
    match parse(expr) {
        Some(guard) => {
            let lhs = counters.get(&guard.counter_name).copied().unwrap_or(0);
            guard.op.apply(lhs, guard.operand)
        }
        None => false,
    }
}

/// Whether `expr` satisfies the guard grammar at all, used by the validator.
#[must_use]
pub fn is_well_formed(expr: &str) -> bool {
    GUARD_PATTERN.is_match(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_operator() {
        for (token, op) in [
            ("<", Op::Lt),
            ("<=", Op::Le),
            (">", Op::Gt),
            (">=", Op::Ge),
            ("==", Op::Eq),
            ("!=", Op::Ne),
        ] {
            let guard = parse(&format!("refund_count {token} 3")).unwrap();
            assert_eq!(guard.op, op);
            assert_eq!(guard.operand, 3);
            assert_eq!(guard.counter_name, "refund_count");
        }
    }

    #[test]
    fn missing_counter_reads_as_zero() {
        let counters = HashMap::new();
        assert!(evaluate("refund_count <= 0", &counters));
        assert!(!evaluate("refund_count > 0", &counters));
    }

    #[test]
    fn malformed_expression_is_false() {
        let counters = HashMap::new();
        assert!(!evaluate("not a guard", &counters));
    }

    #[test]
    fn negative_operand_parses() {
        let guard = parse("balance >= -5").unwrap();
        assert_eq!(guard.operand, -5);
    }
}
