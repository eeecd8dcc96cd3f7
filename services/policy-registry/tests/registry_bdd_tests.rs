//! BDD tests for `policy-registry`'s admin-surface validation helpers —
//! exercisable without a database.

use cucumber::{given, then, when, World};
use gate_core::PolicyVersion;
use policy_registry::{parse_version, validate_policy_name};

#[derive(Debug, World)]
#[world(init = Self::new)]
struct RegistryValidationWorld {
    name: Option<String>,
    version_raw: Option<String>,
    name_result: Option<Result<(), String>>,
    version_result: Option<Result<PolicyVersion, String>>,
}

impl RegistryValidationWorld {
    fn new() -> Self {
        Self {
            name: None,
            version_raw: None,
            name_result: None,
            version_result: None,
        }
    }
}

#[given(regex = r#"^a policy name "(.*)"$"#)]
async fn given_policy_name(world: &mut RegistryValidationWorld, name: String) {
    world.name = Some(name);
}

#[given(regex = r#"^a version string "(.*)"$"#)]
async fn given_version_string(world: &mut RegistryValidationWorld, version: String) {
    world.version_raw = Some(version);
}

#[when("the name is validated")]
async fn when_name_validated(world: &mut RegistryValidationWorld) {
    world.name_result = Some(validate_policy_name(world.name.as_ref().unwrap()));
}

#[when("the version is parsed")]
async fn when_version_parsed(world: &mut RegistryValidationWorld) {
    world.version_result = Some(parse_version(world.version_raw.as_ref().unwrap()));
}

#[then("validation succeeds")]
async fn then_name_succeeds(world: &mut RegistryValidationWorld) {
    assert!(world.name_result.as_ref().unwrap().is_ok());
}

#[then("validation fails")]
async fn then_name_fails(world: &mut RegistryValidationWorld) {
    assert!(world.name_result.as_ref().unwrap().is_err());
}

#[then(regex = r#"^the parsed version is (\d+)$"#)]
async fn then_parsed_version_is(world: &mut RegistryValidationWorld, expected: i64) {
    assert_eq!(*world.version_result.as_ref().unwrap().as_ref().unwrap(), expected);
}

#[then("parsing fails")]
async fn then_parsing_fails(world: &mut RegistryValidationWorld) {
    assert!(world.version_result.as_ref().unwrap().is_err());
}

#[tokio::main]
async fn main() {
    RegistryValidationWorld::run("tests/features").await;
}
