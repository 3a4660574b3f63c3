//! Unit tests for route lookup.

use std::str::FromStr;

use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn table() -> RouteTable {
    RouteTable::standard()
}

#[rstest]
#[case::status(HttpMethod::Get, "/status", "getStatus")]
#[case::create(HttpMethod::Post, "/session", "createSession")]
#[case::delete(HttpMethod::Delete, "/session/abc", "deleteSession")]
#[case::timeouts(HttpMethod::Post, "/session/abc/timeouts", "timeouts")]
#[case::w3c_handles(HttpMethod::Get, "/session/abc/window/handles", "getWindowHandles")]
#[case::jwp_handles(HttpMethod::Get, "/session/abc/window_handles", "getWindowHandles")]
#[case::active(HttpMethod::Get, "/session/abc/element/active", "active")]
#[case::attribute(HttpMethod::Get, "/session/abc/element/e1/attribute/href", "getAttribute")]
#[case::trailing_slash(HttpMethod::Get, "/session/abc/title/", "title")]
#[case::query(HttpMethod::Get, "/session/abc/url?x=1", "getUrl")]
fn resolves_commands(
    table: RouteTable,
    #[case] method: HttpMethod,
    #[case] path: &str,
    #[case] expected: &str,
) {
    let route = table.lookup(method, path).expect("route should resolve");
    assert_eq!(route.command_name(), expected);
}

#[rstest]
fn captures_params_in_template_order(table: RouteTable) {
    let route = table
        .lookup(HttpMethod::Get, "/session/s1/element/e2/attribute/value")
        .expect("route");
    assert_eq!(
        route.params(),
        &[
            ("sessionId", "s1".to_owned()),
            ("elementId", "e2".to_owned()),
            ("name", "value".to_owned()),
        ]
    );
    assert_eq!(route.session_id(), Some("s1"));
    assert_eq!(route.param("elementId"), Some("e2"));
}

#[rstest]
fn unsupported_endpoint_is_not_implemented(table: RouteTable) {
    let error = table
        .lookup(HttpMethod::Get, "/session/s1/local_storage")
        .expect_err("should fail");
    assert!(matches!(error, RouteError::NotImplemented { .. }));
}

#[rstest]
fn wrong_method_on_known_path_is_not_implemented(table: RouteTable) {
    let error = table
        .lookup(HttpMethod::Delete, "/session/s1/url")
        .expect_err("should fail");
    assert!(matches!(error, RouteError::NotImplemented { .. }));
    let converted = WebDriverError::from(error);
    assert_eq!(converted.kind(), ErrorKind::NotImplemented);
}

#[rstest]
fn unknown_path_misses(table: RouteTable) {
    let error = table
        .lookup(HttpMethod::Get, "/session/s1/nonsense/thing")
        .expect_err("should fail");
    assert!(matches!(error, RouteError::Miss { .. }));
    assert_eq!(
        WebDriverError::from(error).kind(),
        ErrorKind::UnknownCommand
    );
}

#[rstest]
fn command_name_is_optional(table: RouteTable) {
    assert_eq!(
        table.command_name(HttpMethod::Post, "/session/x/element"),
        Some("findElement")
    );
    assert_eq!(table.command_name(HttpMethod::Post, "/nowhere"), None);
}

#[rstest]
fn every_command_resolves_to_itself(table: RouteTable) {
    for spec in table.specs() {
        let Some(command) = spec.command else {
            continue;
        };
        let path = spec.path.replace(':', "");
        let route = table
            .lookup(spec.method, &path)
            .unwrap_or_else(|error| panic!("{} {path}: {error}", spec.method));
        assert_eq!(route.command_name(), command, "{path} is shadowed");
    }
}

#[test]
fn session_commands() {
    assert!(!is_session_command("createSession"));
    assert!(!is_session_command("getStatus"));
    assert!(!is_session_command("getSessions"));
    assert!(is_session_command("getUrl"));
}

#[rstest]
#[case::upper("GET", HttpMethod::Get)]
#[case::lower("post", HttpMethod::Post)]
#[case::mixed("Delete", HttpMethod::Delete)]
fn parses_methods(#[case] raw: &str, #[case] expected: HttpMethod) {
    assert_eq!(HttpMethod::from_str(raw).ok(), Some(expected));
    assert_eq!(expected.to_string(), raw.to_ascii_uppercase());
}

#[rstest]
#[case::root("/", "/")]
#[case::empty("", "/")]
#[case::query_only("/status?x", "/status")]
#[case::many_slashes("/session//", "/session")]
fn normalises_paths(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(normalise_path(raw), expected);
}
