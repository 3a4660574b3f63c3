//! Behaviour-driven tests for capability matching.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;

use crate::capabilities::{CapabilityError, CapabilityMatcher, Constraints};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TestWorld {
    matcher: Option<CapabilityMatcher>,
    outcome: Option<Result<Value, CapabilityError>>,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

fn parse_json(raw: &str) -> Value {
    let trimmed = raw.trim_matches('\'');
    serde_json::from_str(trimmed).unwrap_or_else(|error| panic!("bad JSON {trimmed}: {error}"))
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a matcher without constraints")]
fn given_open_matcher(world: &mut TestWorld) {
    world.matcher = Some(CapabilityMatcher::new(Constraints::new()));
}

#[given("a matcher with the mobile defaults")]
fn given_mobile_matcher(world: &mut TestWorld) {
    world.matcher = Some(CapabilityMatcher::new(Constraints::desired_defaults()));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the capabilities request is {request}")]
fn when_request(world: &mut TestWorld, request: String) {
    let matcher = world.matcher.as_ref().expect("matcher configured");
    let outcome = matcher.process(&parse_json(&request)).map(Value::Object);
    world.outcome = Some(outcome);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the matched capabilities are {expected}")]
fn then_matched(world: &mut TestWorld, expected: String) {
    let outcome = world.outcome.as_ref().expect("no outcome captured");
    let matched = outcome.as_ref().expect("expected a match");
    assert_eq!(matched, &parse_json(&expected));
}

#[then("matching fails with {message}")]
fn then_fails(world: &mut TestWorld, message: String) {
    let expected = message.trim_matches('"');
    let outcome = world.outcome.as_ref().expect("no outcome captured");
    let error = outcome.as_ref().expect_err("expected a failure");
    let actual = error.to_string();
    assert!(
        actual.contains(expected),
        "expected '{expected}' in '{actual}'"
    );
}

#[scenario(path = "tests/features/capability_matching.feature")]
fn capability_matching_behaviour(world: TestWorld) {
    let _ = world;
}
