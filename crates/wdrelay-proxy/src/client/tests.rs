//! Unit tests for the proxy client, driven through a scripted transport.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;

const ORIGIN: &str = "http://127.0.0.1:4723/wd/hub";

/// Replays canned answers and records every request it receives.
#[derive(Default)]
struct ScriptedTransport {
    answers: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    fn answering(answers: impl IntoIterator<Item = (u16, Value)>) -> Self {
        let transport = Self::default();
        for (status, body) in answers {
            transport.push(Ok(TransportResponse::new(status, body.to_string())));
        }
        transport
    }

    fn push(&self, answer: Result<TransportResponse, TransportError>) {
        self.answers.lock().expect("answers lock").push_back(answer);
    }

    fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().expect("requests lock").push(request);
        self.answers
            .lock()
            .expect("answers lock")
            .pop_front()
            .unwrap_or_else(|| Ok(TransportResponse::new(200, r#"{"status":0,"value":null}"#)))
    }
}

/// Never answers.
struct SilentTransport;

#[async_trait]
impl HttpTransport for SilentTransport {
    async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, TransportError> {
        std::future::pending().await
    }
}

fn endpoint() -> DownstreamEndpoint {
    DownstreamEndpoint::new("http", "127.0.0.1", 4723, "/wd/hub")
}

fn client(answers: impl IntoIterator<Item = (u16, Value)>) -> ProxyClient<ScriptedTransport> {
    ProxyClient::new(ScriptedTransport::answering(answers), endpoint())
}

#[fixture]
fn in_session() -> ProxyClient<ScriptedTransport> {
    client([]).with_session_id("downstream")
}

#[rstest]
#[case::hub_prefix("/wd/hub/session/abc/url", "/session/downstream/url")]
#[case::absolute("http://localhost:4444/wd/hub/session/abc/element/", "/session/downstream/element")]
#[case::bare_session_path("/session/abc", "/session/downstream")]
#[case::status("/status", "/status")]
#[case::create("/session", "/session")]
#[case::listing("/sessions", "/sessions")]
#[case::relative("/url", "/session/downstream/url")]
#[case::empty("", "/session/downstream")]
fn rewrites_urls(
    in_session: ProxyClient<ScriptedTransport>,
    #[case] url: &str,
    #[case] expected: &str,
) {
    let rewritten = in_session.url_for_proxy(url).expect("url should map");
    assert_eq!(rewritten, format!("{ORIGIN}{expected}"));
}

#[rstest]
#[case::not_a_path("session/abc", "Did not know what to do with url 'session/abc'")]
#[case::no_endpoint("http://localhost:4444/wd/hub", "could not extract JWP endpoint")]
#[case::no_session_segment("/status/extra", "Could not find :session section for url")]
fn rejects_unusable_urls(
    in_session: ProxyClient<ScriptedTransport>,
    #[case] url: &str,
    #[case] expected: &str,
) {
    let error = in_session.url_for_proxy(url).expect_err("url should be rejected");
    assert_eq!(error.kind(), ErrorKind::UnknownError);
    assert!(error.message().contains(expected), "{}", error.message());
}

#[rstest]
#[case::explicit_session("/session/abc/url")]
#[case::relative("/url")]
#[case::root("/")]
#[case::empty("")]
fn session_commands_need_a_session(#[case] url: &str) {
    let error = client([])
        .url_for_proxy(url)
        .expect_err("no session yet");
    assert_eq!(
        error.message(),
        "Trying to proxy a session command without session id"
    );
}

#[tokio::test]
async fn session_creation_captures_the_downstream_session() {
    let client = client([(
        200,
        json!({"value": {"sessionId": "down-1", "capabilities": {}}}),
    )]);
    let response = client
        .proxy("/session", HttpMethod::Post, Some(json!({"capabilities": {}})))
        .await
        .expect("proxy");
    assert_eq!(response.status, 200);
    assert_eq!(client.session_id().as_deref(), Some("down-1"));
    assert_eq!(client.downstream_dialect(), Some(Dialect::W3c));
}

#[tokio::test]
async fn later_session_creation_keeps_the_first_session() {
    let client = client([(
        200,
        json!({"value": {"sessionId": "down-2", "capabilities": {}}}),
    )])
    .with_session_id("downstream");
    client
        .proxy("/session", HttpMethod::Post, Some(json!({"capabilities": {}})))
        .await
        .expect("proxy");
    assert_eq!(client.session_id().as_deref(), Some("downstream"));
}

#[rstest]
#[tokio::test]
async fn get_requests_never_carry_a_body(in_session: ProxyClient<ScriptedTransport>) {
    in_session
        .proxy("/session/abc/url", HttpMethod::Get, Some(json!({"x": 1})))
        .await
        .expect("proxy");
    let requests = in_session.transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests.first().and_then(|request| request.body.clone()), None);
}

#[rstest]
#[tokio::test]
async fn string_bodies_are_parsed(in_session: ProxyClient<ScriptedTransport>) {
    in_session
        .proxy(
            "/session/abc/url",
            HttpMethod::Post,
            Some(json!(r#"{"url": "http://example.test"}"#)),
        )
        .await
        .expect("proxy");
    let body = in_session
        .transport
        .requests()
        .first()
        .and_then(|request| request.body.clone());
    assert_eq!(body, Some(json!({"url": "http://example.test"})));
}

#[rstest]
#[tokio::test]
async fn unparsable_string_bodies_are_rejected(in_session: ProxyClient<ScriptedTransport>) {
    let error = in_session
        .proxy("/session/abc/url", HttpMethod::Post, Some(json!("{nope")))
        .await
        .expect_err("should fail");
    assert!(
        error
            .message()
            .starts_with("Cannot interpret the request body as valid JSON: {nope")
    );
    assert!(in_session.transport.requests().is_empty());
}

#[tokio::test]
async fn non_object_answers_are_proxy_failures() {
    let client = client([]).with_session_id("s");
    client
        .transport
        .push(Ok(TransportResponse::new(200, "<html>oops</html>")));
    let error = client
        .proxy("/session/s/url", HttpMethod::Get, None)
        .await
        .expect_err("should fail");
    assert_eq!(error.kind(), ErrorKind::ProxyRequest);
    assert_eq!(
        error.message(),
        format!(
            "Could not proxy command to remote server. Original error: The request to {ORIGIN}/session/s/url has failed"
        )
    );
}

#[tokio::test]
async fn legacy_failures_on_success_statuses_surface_as_backend_errors() {
    let client = client([(200, json!({"status": 13, "value": "boom"}))]).with_session_id("s");
    let error = client
        .command("/session/s/url", HttpMethod::Get, None)
        .await
        .expect_err("should fail");
    assert_eq!(error.message(), "boom");
    assert_eq!(error.legacy_status(), 13);
    assert_eq!(error.kind(), ErrorKind::UnknownError);
}

#[tokio::test]
async fn w3c_failures_decode_their_error_code() {
    let client = client([(
        404,
        json!({"value": {"error": "no such element", "message": "gone", "stacktrace": "at x"}}),
    )])
    .with_session_id("s");
    let error = client
        .command("/session/s/element", HttpMethod::Post, Some(json!({"using": "id", "value": "a"})))
        .await
        .expect_err("should fail");
    assert_eq!(error.kind(), ErrorKind::NoSuchElement);
    assert_eq!(error.message(), "gone");
    assert_eq!(error.stacktrace(), Some("at x"));
}

#[rstest]
#[case::jwp(200, json!({"status": 0, "value": "title"}), json!("title"))]
#[case::w3c(200, json!({"value": {"ready": true}}), json!({"ready": true}))]
#[case::undetermined(200, json!({"ready": true}), json!({"ready": true}))]
#[tokio::test]
async fn successful_answers_yield_their_value(
    #[case] status: u16,
    #[case] body: Value,
    #[case] expected: Value,
) {
    let client = client([(status, body)]).with_session_id("s");
    let value = client
        .command("/session/s/title", HttpMethod::Get, None)
        .await
        .expect("command");
    assert_eq!(value, expected);
}

#[tokio::test]
async fn unintelligible_answers_are_unknown_errors() {
    let client = client([(500, json!({"ready": false}))]).with_session_id("s");
    let error = client
        .command("/session/s/title", HttpMethod::Get, None)
        .await
        .expect_err("should fail");
    assert_eq!(
        error.message(),
        r#"Did not know what to do with response code '500' and response body '{"ready":false}'"#
    );
}

#[tokio::test]
async fn transport_failures_are_wrapped() {
    let client = client([]).with_session_id("s");
    client.transport.push(Err(TransportError::Timeout {
        url: format!("{ORIGIN}/session/s/url"),
    }));
    let error = client
        .proxy("/session/s/url", HttpMethod::Get, None)
        .await
        .expect_err("should fail");
    assert_eq!(error.kind(), ErrorKind::ProxyRequest);
    assert!(error.message().starts_with(
        "Could not proxy command to remote server. Original error: request to"
    ));
    let actual = actual_error(error);
    assert_eq!(actual.kind(), ErrorKind::UnknownError);
    assert!(actual.message().ends_with("timed out"));
}

#[tokio::test]
async fn timeouts_are_converted_for_legacy_backends() {
    let client = client([])
        .with_session_id("down")
        .with_dialect(Dialect::Jwp);
    client
        .proxy_command(
            "/session/abc123/timeouts",
            HttpMethod::Post,
            Some(json!({"script": 100})),
        )
        .await
        .expect("proxy");
    let requests = client.transport.requests();
    assert_eq!(
        requests,
        vec![TransportRequest {
            method: HttpMethod::Post,
            url: format!("{ORIGIN}/session/down/timeouts"),
            body: Some(json!({"type": "script", "ms": 100})),
        }]
    );
}

#[tokio::test]
async fn converted_calls_stop_at_the_first_failure() {
    let client = client([(500, json!({"status": 13, "value": "nope"}))])
        .with_session_id("down")
        .with_dialect(Dialect::Jwp);
    let response = client
        .proxy_command(
            "/wd/hub/session/abc/timeouts",
            HttpMethod::Post,
            Some(json!({"script": 1, "implicit": 2})),
        )
        .await
        .expect("proxy");
    assert_eq!(response.status, 500);
    assert_eq!(client.transport.requests().len(), 1);
}

#[tokio::test]
async fn window_handle_urls_follow_the_backend() {
    let client = client([])
        .with_session_id("down")
        .with_dialect(Dialect::W3c);
    client
        .proxy_command("/session/abc/window_handles", HttpMethod::Get, None)
        .await
        .expect("proxy");
    let urls: Vec<String> = client
        .transport
        .requests()
        .into_iter()
        .map(|request| request.url)
        .collect();
    assert_eq!(urls, vec![format!("{ORIGIN}/session/down/window/handles")]);
}

#[rstest]
#[case::inbound_id("/wd/hub/session/abc/url", "abc")]
#[case::no_inbound_id("/status", "down")]
#[tokio::test]
async fn answers_carry_the_inbound_session_id(#[case] url: &str, #[case] expected: &str) {
    let client = client([(200, json!({"sessionId": "down", "status": 0, "value": null}))])
        .with_session_id("down");
    let response = client
        .proxy_req_res(url, HttpMethod::Get, None)
        .await
        .expect("proxy");
    assert_eq!(response.body.get("sessionId"), Some(&json!(expected)));
}

#[tokio::test]
async fn null_session_ids_are_left_alone() {
    let client = client([(200, json!({"sessionId": null, "status": 0, "value": 1}))])
        .with_session_id("down");
    let response = client
        .proxy_req_res("/session/abc/url", HttpMethod::Get, None)
        .await
        .expect("proxy");
    assert_eq!(response.body.get("sessionId"), Some(&Value::Null));
}

#[tokio::test]
async fn cancelling_abandons_calls_in_flight() {
    let client = ProxyClient::new(SilentTransport, endpoint()).with_session_id("s");
    let call = client.proxy("/session/s/url", HttpMethod::Get, None);
    let cancel = async {
        while client.active_request_count() == 0 {
            tokio::task::yield_now().await;
        }
        client.cancel_active_requests()
    };
    let (outcome, cancelled) = tokio::join!(call, cancel);
    assert_eq!(cancelled, 1);
    let error = outcome.expect_err("call should be cancelled");
    assert_eq!(error.kind(), ErrorKind::ProxyRequest);
    assert!(error.message().ends_with("was cancelled"));
    assert_eq!(client.active_request_count(), 0);
}

#[test]
fn cancelling_with_nothing_in_flight_is_harmless() {
    assert_eq!(client([]).cancel_active_requests(), 0);
}

#[rstest]
#[case::hub("/wd/hub/session/abc/timeouts", HttpMethod::Post, Some("timeouts"))]
#[case::absolute("http://h:1/wd/hub/session/abc/url", HttpMethod::Get, Some("getUrl"))]
#[case::relative("/title", HttpMethod::Get, Some("title"))]
#[case::status("/wd/hub/status", HttpMethod::Get, Some("getStatus"))]
#[case::unknown("/session/abc/nonsense", HttpMethod::Get, None)]
fn resolves_command_names(
    in_session: ProxyClient<ScriptedTransport>,
    #[case] url: &str,
    #[case] method: HttpMethod,
    #[case] expected: Option<&str>,
) {
    assert_eq!(in_session.command_name(url, method), expected);
}

#[test]
fn logs_under_the_proxy_area() {
    assert_eq!(PROXY_TARGET, wdrelay_config::LogArea::Proxy.target());
}
