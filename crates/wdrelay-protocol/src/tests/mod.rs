//! Crate-level behaviour tests.

mod behaviour;

use serde_json::json;

use crate::{LOG_OBJ_LENGTH, truncate_for_log};

#[test]
fn short_values_are_logged_whole() {
    assert_eq!(truncate_for_log(&json!({"a": 1})), r#"{"a":1}"#);
}

#[test]
fn long_values_are_cut() {
    let long = "x".repeat(LOG_OBJ_LENGTH * 2);
    let logged = truncate_for_log(&json!(long));
    assert_eq!(logged.chars().count(), LOG_OBJ_LENGTH + 3);
    assert!(logged.ends_with("..."));
}
