use audit_log::redact;
use cucumber::{given, then, when, World};
use serde_json::Value;

#[derive(Debug, World)]
#[world(init = Self::new)]
struct RedactionWorld {
    payload: Value,
    redacted: Option<Value>,
}

impl RedactionWorld {
    fn new() -> Self {
        Self {
            payload: Value::Object(Default::default()),
            redacted: None,
        }
    }
}

#[given(regex = r#"^a payload with field "(.+)" set to "(.+)"$"#)]
fn a_payload_with_field(world: &mut RedactionWorld, field: String, value: String) {
    world.payload[field] = Value::String(value);
}

#[when("the payload is redacted")]
fn the_payload_is_redacted(world: &mut RedactionWorld) {
    world.redacted = Some(redact(&world.payload));
}

#[then(regex = r#"^field "(.+)" equals "(.+)"$"#)]
fn field_equals(world: &mut RedactionWorld, field: String, expected: String) {
    let redacted = world.redacted.as_ref().unwrap();
    assert_eq!(redacted[field.as_str()], Value::String(expected));
}

#[tokio::main]
async fn main() {
    RedactionWorld::run("tests/features").await;
}
