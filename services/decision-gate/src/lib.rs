//! Request-shape validation for `POST /runtime-check` (spec §6), split out
//! of `main` so it can be exercised without a database or a bound socket.

use gate_core::CallRequest;

/// Checks the wire-level shape of a decoded [`CallRequest`]: the three
/// identifier fields must be non-empty and at most 256 characters, and
/// `payload` must be a JSON object. Anything past this point (unknown tool,
/// policy rules, session state) is the evaluator's concern, not this
/// function's.
pub fn validate_request(request: &CallRequest) -> Result<(), String> {
    fn bounded(field: &str, value: &str) -> Result<(), String> {
        if value.is_empty() || value.len() > 256 {
            Err(format!("{field} must be 1..256 characters"))
        } else {
            Ok(())
        }
    }
    bounded("sessionId", &request.session_id)?;
    bounded("agentId", &request.agent_id)?;
    bounded("toolName", &request.tool_name)?;
    if !request.payload.is_object() {
        return Err("payload must be a JSON object".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(session_id: &str, payload: serde_json::Value) -> CallRequest {
        CallRequest {
            session_id: session_id.to_string(),
            agent_id: "agent-1".to_string(),
            tool_name: "refund_payment".to_string(),
            action_type: None,
            payload,
            metadata: None,
        }
    }

    #[test]
    fn rejects_empty_session_id() {
        assert!(validate_request(&sample("", json!({}))).is_err());
    }

    #[test]
    fn rejects_non_object_payload() {
        assert!(validate_request(&sample("s1", json!("not-an-object"))).is_err());
    }

    #[test]
    fn rejects_an_oversized_field() {
        let oversized = "x".repeat(257);
        assert!(validate_request(&sample(&oversized, json!({}))).is_err());
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(validate_request(&sample("s1", json!({}))).is_ok());
    }
}
