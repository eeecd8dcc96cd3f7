//! BDD tests for `decision-gate`'s request-shape validation — the one seam
//! in this service that's exercisable without a database or bound socket.

use cucumber::{given, then, when, World};
use decision_gate::validate_request;
use gate_core::CallRequest;
use serde_json::{json, Value};

#[derive(Debug, World)]
#[world(init = Self::new)]
struct RequestValidationWorld {
    request: Option<CallRequest>,
    result: Option<Result<(), String>>,
}

impl RequestValidationWorld {
    fn new() -> Self {
        Self {
            request: None,
            result: None,
        }
    }
}

fn build_request(session_id: &str, tool_name: &str, payload: Value) -> CallRequest {
    CallRequest {
        session_id: session_id.to_string(),
        agent_id: "agent-1".to_string(),
        tool_name: tool_name.to_string(),
        action_type: None,
        payload,
        metadata: None,
    }
}

#[given(regex = r#"^a call request with sessionId "(.*)", toolName "(.+)", and an object payload$"#)]
async fn given_object_payload_request(world: &mut RequestValidationWorld, session_id: String, tool_name: String) {
    world.request = Some(build_request(&session_id, &tool_name, json!({})));
}

#[given(regex = r#"^a call request with sessionId "(.*)", toolName "(.+)", and a string payload$"#)]
async fn given_string_payload_request(world: &mut RequestValidationWorld, session_id: String, tool_name: String) {
    world.request = Some(build_request(&session_id, &tool_name, json!("not-an-object")));
}

#[when("the request is validated")]
async fn when_validated(world: &mut RequestValidationWorld) {
    world.result = Some(validate_request(world.request.as_ref().unwrap()));
}

#[then("validation succeeds")]
async fn then_succeeds(world: &mut RequestValidationWorld) {
    assert!(world.result.as_ref().unwrap().is_ok());
}

#[then("validation fails")]
async fn then_fails(world: &mut RequestValidationWorld) {
    assert!(world.result.as_ref().unwrap().is_err());
}

#[tokio::main]
async fn main() {
    RequestValidationWorld::run("tests/features").await;
}
