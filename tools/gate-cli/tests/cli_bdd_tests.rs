use cucumber::{given, then, when, World};
use gate_cli::env_mismatch_warning;
use serde_json::{json, Value};

#[derive(Debug, World)]
#[world(init = Self::new)]
struct EnvMismatchWorld {
    body: Option<Value>,
    warning: Option<Option<String>>,
}

impl EnvMismatchWorld {
    fn new() -> Self {
        Self {
            body: None,
            warning: None,
        }
    }
}

#[given(regex = r#"^a fetched session with envId "(.*)"$"#)]
async fn given_session_with_env(world: &mut EnvMismatchWorld, env_id: String) {
    world.body = Some(json!({ "env_id": env_id }));
}

#[when(regex = r#"^checked against expected env "(.*)"$"#)]
async fn when_checked(world: &mut EnvMismatchWorld, expected_env: String) {
    world.warning = Some(env_mismatch_warning(
        world.body.as_ref().unwrap(),
        &expected_env,
        "s1",
    ));
}

#[then("no warning is produced")]
async fn then_no_warning(world: &mut EnvMismatchWorld) {
    assert!(world.warning.as_ref().unwrap().is_none());
}

#[then("a warning is produced")]
async fn then_warning(world: &mut EnvMismatchWorld) {
    assert!(world.warning.as_ref().unwrap().is_some());
}

#[tokio::main]
async fn main() {
    EnvMismatchWorld::run("tests/features").await;
}
