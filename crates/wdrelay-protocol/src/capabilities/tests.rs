//! Unit tests for capability validation and matching.

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[fixture]
fn open_matcher() -> CapabilityMatcher {
    CapabilityMatcher::new(Constraints::new())
}

#[fixture]
fn mobile_matcher() -> CapabilityMatcher {
    CapabilityMatcher::new(Constraints::desired_defaults())
}

#[rstest]
fn empty_request_matches_nothing(open_matcher: CapabilityMatcher) {
    let matched = open_matcher
        .process(&json!({"alwaysMatch": {}, "firstMatch": []}))
        .expect("process");
    assert!(matched.is_empty());
}

#[rstest]
fn disjoint_entries_merge(open_matcher: CapabilityMatcher) {
    let matched = open_matcher
        .process(&json!({"alwaysMatch": {"a": 1}, "firstMatch": [{"b": 2}]}))
        .expect("process");
    assert_eq!(matched, object(json!({"a": 1, "b": 2})));
}

#[rstest]
fn colliding_entry_degrades_to_always_match(open_matcher: CapabilityMatcher) {
    let matched = open_matcher
        .process(&json!({"alwaysMatch": {"a": 1}, "firstMatch": [{"a": 2}]}))
        .expect("process");
    assert_eq!(matched, object(json!({"a": 1})));
}

#[rstest]
fn first_non_colliding_entry_wins(open_matcher: CapabilityMatcher) {
    let matched = open_matcher
        .process(&json!({
            "alwaysMatch": {"a": 1},
            "firstMatch": [{"a": 2}, {"c": 3}, {"d": 4}],
        }))
        .expect("process");
    assert_eq!(matched, object(json!({"a": 1, "c": 3})));
}

#[rstest]
fn missing_sections_default_to_empty(open_matcher: CapabilityMatcher) {
    assert!(open_matcher.process(&json!({})).expect("process").is_empty());
    let matched = open_matcher
        .process(&json!({"alwaysMatch": "nope", "firstMatch": null}))
        .expect("process");
    assert!(matched.is_empty());
}

#[rstest]
#[case::string(json!("caps"), CapabilityError::InvalidRoot)]
#[case::array(json!([]), CapabilityError::InvalidRoot)]
#[case::first_match_object(json!({"firstMatch": {}}), CapabilityError::InvalidFirstMatch)]
fn shape_errors_are_hard(
    open_matcher: CapabilityMatcher,
    #[case] request: Value,
    #[case] expected: CapabilityError,
) {
    assert_eq!(open_matcher.process(&request), Err(expected));
}

#[rstest]
fn always_match_violations_are_hard(mobile_matcher: CapabilityMatcher) {
    let error = mobile_matcher
        .process(&json!({"alwaysMatch": {"platformName": "Windows", "noReset": "yes"}}))
        .expect_err("should reject");
    assert_eq!(
        error.to_string(),
        "noReset must be of type boolean, platformName Windows is not included in the list."
    );
}

#[rstest]
fn invalid_first_match_entries_are_skipped(mobile_matcher: CapabilityMatcher) {
    let parsed = mobile_matcher
        .parse(&json!({
            "alwaysMatch": {"platformName": "iOS"},
            "firstMatch": [{"deviceName": 7}, "junk", {"deviceName": "iPad"}],
        }))
        .expect("parse");
    assert_eq!(parsed.all_first_match.len(), 3);
    assert_eq!(parsed.validated_first_match.len(), 1);
    assert_eq!(
        parsed.matched,
        object(json!({"platformName": "iOS", "deviceName": "iPad"}))
    );
}

#[rstest]
fn first_match_may_rely_on_always_match_presence(mobile_matcher: CapabilityMatcher) {
    let matched = mobile_matcher
        .process(&json!({
            "alwaysMatch": {"platformName": "iOS"},
            "firstMatch": [{"deviceName": "iPhone"}],
        }))
        .expect("process");
    assert_eq!(
        matched,
        object(json!({"platformName": "iOS", "deviceName": "iPhone"}))
    );
}

#[test]
fn strict_presence_drops_incomplete_entries() {
    let matcher =
        CapabilityMatcher::new(Constraints::desired_defaults()).relax_first_match_presence(false);
    let parsed = matcher
        .parse(&json!({
            "alwaysMatch": {"platformName": "iOS"},
            "firstMatch": [{"deviceName": "iPhone"}],
        }))
        .expect("parse");
    assert!(parsed.validated_first_match.is_empty());
    assert_eq!(parsed.matched, object(json!({"platformName": "iOS"})));
}

#[test]
fn disabled_validation_accepts_any_object_entry() {
    let matcher =
        CapabilityMatcher::new(Constraints::desired_defaults()).without_first_match_validation();
    let matched = matcher
        .process(&json!({"firstMatch": [{"platformName": "Windows"}]}))
        .expect("process");
    assert_eq!(matched, object(json!({"platformName": "Windows"})));
}

#[rstest]
#[case::blank(json!({}), "deviceName can't be blank.")]
#[case::null_is_blank(json!({"deviceName": null}), "deviceName can't be blank.")]
#[case::wrong_type(json!({"deviceName": 3}), "deviceName must be of type string.")]
fn constraint_messages(#[case] caps: Value, #[case] expected: &str) {
    let constraints = Constraints::new().with(
        "deviceName",
        Constraint::new().required().of_type(ValueType::String),
    );
    let error = validate_capabilities(&caps, &constraints, Presence::Enforced)
        .expect_err("should reject");
    assert_eq!(error.to_string(), expected);
}

#[rstest]
#[case::exact(json!("uiautomator2"), true)]
#[case::other_case(json!("UIAutomator2"), true)]
#[case::unknown(json!("espresso"), false)]
fn case_insensitive_inclusion(#[case] value: Value, #[case] ok: bool) {
    let constraints = Constraints::new().with(
        "automationName",
        Constraint::new().one_of_ignoring_case(["uiautomator2", "XCUITest"]),
    );
    let outcome = validate_capabilities(
        &json!({"automationName": value}),
        &constraints,
        Presence::Enforced,
    );
    assert_eq!(outcome.is_ok(), ok);
    if let Err(error) = outcome {
        assert_eq!(
            error.to_string(),
            "automationName espresso not part of uiautomator2,XCUITest."
        );
    }
}

#[test]
fn deprecated_capabilities_never_fail() {
    let constraints = Constraints::new().with("oldCap", Constraint::new().deprecated());
    let caps = json!({"oldCap": true});
    assert!(validate_capabilities(&caps, &constraints, Presence::Enforced).is_ok());
}

#[test]
fn non_object_capabilities_are_rejected() {
    let outcome = validate_capabilities(&json!(5), &Constraints::new(), Presence::Enforced);
    assert_eq!(outcome, Err(CapabilityError::NotAnObject));
}

#[test]
fn merge_reports_collisions() {
    let error = merge_capabilities(&object(json!({"a": 1})), &object(json!({"a": 1})))
        .expect_err("collision");
    assert_eq!(
        error.to_string(),
        "property a should not exist on both primary and secondary"
    );
}

#[test]
fn session_body_prefers_w3c_capabilities() {
    let body = json!({
        "capabilities": {"alwaysMatch": {"a": 1}},
        "desiredCapabilities": {"b": 2},
    });
    let request = CapabilitiesRequest::from_session_body(&body).expect("request");
    assert_eq!(request.as_value(), &json!({"alwaysMatch": {"a": 1}}));
}

#[test]
fn legacy_session_body_is_converted() {
    let body = json!({
        "desiredCapabilities": {"platformName": "iOS", "app": "a.app"},
        "requiredCapabilities": {"app": "b.app"},
    });
    let request = CapabilitiesRequest::from_session_body(&body).expect("request");
    assert_eq!(
        request.as_value(),
        &json!({
            "alwaysMatch": {"platformName": "iOS", "app": "b.app"},
            "firstMatch": [{}],
        })
    );
}

#[test]
fn session_body_without_capabilities() {
    assert!(CapabilitiesRequest::from_session_body(&json!({"foo": 1})).is_none());
}

#[test]
fn capability_errors_become_invalid_argument() {
    let error = WebDriverError::from(CapabilityError::InvalidFirstMatch);
    assert_eq!(error.kind(), ErrorKind::InvalidArgument);
}
