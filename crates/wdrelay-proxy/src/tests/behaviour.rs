//! Behaviour-driven tests for protocol conversion.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use wdrelay_protocol::Dialect;

use crate::converter::{ConversionPlan, ProtocolConverter};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TestWorld {
    converter: Option<ProtocolConverter>,
    plan: Option<ConversionPlan>,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

fn parse_json(raw: &str) -> Value {
    let trimmed = raw.trim_matches('\'');
    serde_json::from_str(trimmed).unwrap_or_else(|error| panic!("bad JSON {trimmed}: {error}"))
}

fn plan(world: &TestWorld) -> &ConversionPlan {
    world.plan.as_ref().expect("no plan captured")
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a backend speaking JSONWP")]
fn given_jwp_backend(world: &mut TestWorld) {
    world.converter = Some(ProtocolConverter::new(Some(Dialect::Jwp)));
}

#[given("a backend speaking W3C")]
fn given_w3c_backend(world: &mut TestWorld) {
    world.converter = Some(ProtocolConverter::new(Some(Dialect::W3c)));
}

#[given("a backend of unknown dialect")]
fn given_unknown_backend(world: &mut TestWorld) {
    world.converter = Some(ProtocolConverter::new(None));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the {command} command is planned with {body}")]
fn when_planned(world: &mut TestWorld, command: String, body: String) {
    let converter = world.converter.expect("converter configured");
    let url = format!("/session/abc/{command}");
    world.plan = Some(converter.plan(&command, &url, Some(parse_json(&body))));
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the plan sends {body}")]
fn then_plan_sends(world: &mut TestWorld, body: String) {
    let expected = parse_json(&body);
    let sent = plan(world)
        .calls()
        .iter()
        .any(|call| call.body.as_ref() == Some(&expected));
    assert!(sent, "no call carries {expected}");
}

#[then("the plan has {count} calls")]
fn then_plan_size(world: &mut TestWorld, count: usize) {
    assert_eq!(plan(world).len(), count);
}

#[scenario(path = "tests/features/protocol_conversion.feature")]
fn protocol_conversion_behaviour(world: TestWorld) {
    let _ = world;
}
