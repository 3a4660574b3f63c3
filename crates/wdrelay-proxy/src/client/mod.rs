//! Downstream session handling, request bookkeeping and response decoding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use wdrelay_config::{Config, DownstreamEndpoint};
use wdrelay_protocol::error::parse_legacy_status;
use wdrelay_protocol::{
    Dialect, DialectTracker, ErrorKind, HttpMethod, RouteTable, WebDriverError, truncate_for_log,
};

use crate::PROXY_TARGET;
use crate::converter::ProtocolConverter;
use crate::transport::{
    HttpTransport, ReqwestTransport, TransportError, TransportRequest, TransportResponse,
};

const MISSING_SESSION_ID: &str = "Trying to proxy a session command without session id";
const PROXY_ERROR_PREFIX: &str = "Could not proxy command to remote server. Original error:";
const RESPONSE_EXCERPT_LENGTH: usize = 300;
const SESSIONLESS_PATHS: [&str; 3] = ["/session", "/sessions", "/status"];
const SESSION_PLACEHOLDER: &str = ":sessionId";

/// Status and parsed body of a downstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    /// HTTP status the backend answered with.
    pub status: u16,
    /// Response body; always a JSON object.
    pub body: Value,
}

#[derive(Debug)]
struct ActiveEntry {
    method: HttpMethod,
    url: String,
    token: CancellationToken,
}

/// Downstream calls that have been sent and not yet answered.
#[derive(Debug, Default)]
pub struct ActiveRequests {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, ActiveEntry>>,
}

impl ActiveRequests {
    fn register(&self, method: HttpMethod, url: &str) -> ActiveGuard<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.entries().insert(
            id,
            ActiveEntry {
                method,
                url: url.to_owned(),
                token: token.clone(),
            },
        );
        ActiveGuard {
            requests: self,
            id,
            token,
        }
    }

    /// Cancels every outstanding call and forgets it; returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<ActiveEntry> = self.entries().drain().map(|(_, entry)| entry).collect();
        for entry in &drained {
            debug!(
                target: PROXY_TARGET,
                method = %entry.method,
                url = %entry.url,
                "cancelling downstream request"
            );
            entry.token.cancel();
        }
        drained.len()
    }

    /// Number of outstanding calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether no call is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<u64, ActiveEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its call from the active set when dropped.
struct ActiveGuard<'a> {
    requests: &'a ActiveRequests,
    id: u64,
    token: CancellationToken,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.requests.entries().remove(&self.id);
    }
}

#[derive(Debug, Default)]
struct DownstreamState {
    session_id: Option<String>,
    dialect: DialectTracker,
}

/// Client for one downstream WebDriver backend.
///
/// The client holds at most one downstream session. Inbound session ids are
/// replaced by it on the way out and the backend's id is replaced by the
/// inbound one on the way back.
pub struct ProxyClient<T> {
    transport: T,
    endpoint: DownstreamEndpoint,
    routes: RouteTable,
    state: Mutex<DownstreamState>,
    active: ActiveRequests,
}

impl ProxyClient<ReqwestTransport> {
    /// Client for the configured downstream endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::from_config(config)?;
        Ok(Self::new(transport, config.downstream().clone()))
    }
}

impl<T: HttpTransport> ProxyClient<T> {
    /// Client sending through `transport` to `endpoint`.
    pub fn new(transport: T, endpoint: DownstreamEndpoint) -> Self {
        Self {
            transport,
            endpoint,
            routes: RouteTable::standard(),
            state: Mutex::new(DownstreamState::default()),
            active: ActiveRequests::default(),
        }
    }

    /// Starts with an established downstream session.
    #[must_use]
    pub fn with_session_id(self, session_id: impl Into<String>) -> Self {
        self.set_session_id(Some(session_id.into()));
        self
    }

    /// Starts with a known backend dialect.
    ///
    /// A session-creation response may still correct it.
    #[must_use]
    pub fn with_dialect(self, dialect: Dialect) -> Self {
        self.state().dialect.adopt(dialect);
        self
    }

    /// Backend location.
    #[must_use]
    pub const fn endpoint(&self) -> &DownstreamEndpoint {
        &self.endpoint
    }

    /// Downstream session id, once established.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.state().session_id.clone()
    }

    /// Replaces the downstream session id.
    pub fn set_session_id(&self, session_id: Option<String>) {
        self.state().session_id = session_id;
    }

    /// Dialect the backend has been seen speaking.
    #[must_use]
    pub fn downstream_dialect(&self) -> Option<Dialect> {
        self.state().dialect.current()
    }

    /// Number of downstream calls in flight.
    #[must_use]
    pub fn active_request_count(&self) -> usize {
        self.active.len()
    }

    /// Cancels every call in flight. Cancelled calls fail with a proxy error.
    pub fn cancel_active_requests(&self) -> usize {
        let cancelled = self.active.cancel_all();
        if cancelled > 0 {
            info!(target: PROXY_TARGET, cancelled, "cancelled downstream requests");
        }
        cancelled
    }

    /// Maps an inbound URL onto the backend.
    ///
    /// `url` is either absolute or a path starting with `/`. Anything before
    /// `/session` or `/status` is dropped, paths naming neither are taken as
    /// relative to the current session, and the session segment is replaced
    /// with the downstream session id.
    ///
    /// # Errors
    ///
    /// Unknown errors when the URL cannot be interpreted or needs a session
    /// that has not been established.
    pub fn url_for_proxy(&self, url: &str) -> Result<String, WebDriverError> {
        let url = if url.is_empty() { "/" } else { url };
        let path = if url.starts_with("http") {
            let path = path_of(url);
            if endpoint_start(path).is_none() {
                return Err(WebDriverError::unknown(format!(
                    "Got a complete url but could not extract JWP endpoint: {url}"
                )));
            }
            path
        } else if url.starts_with('/') {
            url
        } else {
            return Err(WebDriverError::unknown(format!(
                "Did not know what to do with url '{url}'"
            )));
        };

        let session_id = self.session_id();
        let remaining = match (endpoint_start(path), session_id.as_deref()) {
            (Some(start), _) => path.split_at(start).1.to_owned(),
            (None, Some(id)) => format!("/session/{id}{path}"),
            (None, None) => return Err(WebDriverError::unknown(MISSING_SESSION_ID)),
        };
        let remaining = remaining.trim_end_matches('/');
        let origin = self.endpoint.origin_with_base();
        if SESSIONLESS_PATHS.contains(&remaining) {
            return Ok(format!("{origin}{remaining}"));
        }

        let Some(session_id) = session_id else {
            return Err(WebDriverError::unknown(MISSING_SESSION_ID));
        };
        let tail = remaining
            .strip_prefix("/session/")
            .and_then(|rest| {
                let (id, tail) = rest.split_once('/').unwrap_or((rest, ""));
                (!id.is_empty()).then_some(tail)
            })
            .ok_or_else(|| {
                WebDriverError::unknown(format!(
                    "Could not find :session section for url: {remaining}"
                ))
            })?;
        if tail.is_empty() {
            Ok(format!("{origin}/session/{session_id}"))
        } else {
            Ok(format!("{origin}/session/{session_id}/{tail}"))
        }
    }

    /// Sends one request downstream and parses the answer.
    ///
    /// A `200` answer to `POST /session` establishes the downstream session,
    /// and every answer refreshes the backend dialect.
    ///
    /// # Errors
    ///
    /// Unknown errors for unusable URLs or bodies. Proxy request errors for
    /// transport failures, non-object answers and legacy answers reporting a
    /// non-zero status below HTTP 400.
    pub async fn proxy(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<Value>,
    ) -> Result<ProxyResponse, WebDriverError> {
        let target = self.url_for_proxy(url)?;
        let body = if method == HttpMethod::Get {
            None
        } else {
            request_body(body)?
        };
        debug!(
            target: PROXY_TARGET,
            %method,
            url = %target,
            body = %body.as_ref().map(truncate_for_log).unwrap_or_default(),
            "proxying to downstream"
        );

        let request = TransportRequest {
            method,
            url: target.clone(),
            body,
        };
        let response = self.send(request).await.map_err(|error| {
            WebDriverError::proxy_request(format!("{PROXY_ERROR_PREFIX} {error}"), None, None)
                .with_source(error)
        })?;
        let TransportResponse { status, body: text } = response;

        let Some(body) = serde_json::from_str::<Value>(&text)
            .ok()
            .filter(Value::is_object)
        else {
            return Err(request_failed(&target, Value::String(text)));
        };
        debug!(
            target: PROXY_TARGET,
            status,
            body = %truncate_for_log(&body),
            "downstream responded"
        );

        let session_creation = method == HttpMethod::Post && is_new_session_url(url);
        if session_creation
            && status == 200
            && let Some(session_id) = created_session_id(&body)
            && self.capture_session_id(session_id)
        {
            info!(target: PROXY_TARGET, session_id, "downstream session established");
        }
        let dialect = {
            let mut state = self.state();
            state.dialect.observe(&body, session_creation);
            state.dialect.current()
        };

        let failed_status = body
            .get("status")
            .filter(|code| !code.is_null())
            .is_some_and(|code| parse_legacy_status(code) != Some(0));
        if status < 400 && dialect == Some(Dialect::Jwp) && failed_status {
            return Err(request_failed(&target, body));
        }
        Ok(ProxyResponse { status, body })
    }

    /// Proxies a command, converting it for the backend's dialect.
    ///
    /// A converted command may issue several calls; they stop at the first
    /// answer with HTTP 400 or above and the last answer is returned.
    ///
    /// # Errors
    ///
    /// See [`ProxyClient::proxy`].
    pub async fn proxy_command(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<Value>,
    ) -> Result<ProxyResponse, WebDriverError> {
        let Some(command) = self.command_name(url, method) else {
            debug!(target: PROXY_TARGET, url, "no command routed; forwarding as-is");
            return self.proxy(url, method, body).await;
        };
        let body = if method == HttpMethod::Get {
            None
        } else {
            request_body(body)?
        };
        let converter = ProtocolConverter::new(self.downstream_dialect()).with_routes(self.routes);
        let mut last = None;
        for call in converter.plan(command, url, body) {
            let response = self.proxy(&call.url, method, call.body).await?;
            let failed = response.status >= 400;
            last = Some(response);
            if failed {
                break;
            }
        }
        last.ok_or_else(|| {
            WebDriverError::unknown(format!("No downstream call was planned for '{command}'"))
        })
    }

    /// Proxies a command and decodes the backend's answer into a value.
    ///
    /// # Errors
    ///
    /// The backend's own error when it reported one, otherwise an unknown
    /// error describing the unusable answer.
    pub async fn command(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<Value>,
    ) -> Result<Value, WebDriverError> {
        let ProxyResponse { status, body } = self
            .proxy_command(url, method, body)
            .await
            .map_err(actual_error)?;
        let value = || body.get("value").cloned().unwrap_or(Value::Null);
        match Dialect::detect(&body) {
            Some(Dialect::Jwp) => {
                let code = body.get("status").and_then(parse_legacy_status);
                if status == 200 && code == Some(0) {
                    return Ok(value());
                }
                if let Some(code) = code.filter(|code| *code != 0) {
                    return Err(WebDriverError::from_legacy_status(code, &value()));
                }
            }
            Some(Dialect::W3c) => {
                let value = value();
                if status < 300 {
                    return Ok(value);
                }
                if let Some(code) = value.get("error").and_then(Value::as_str) {
                    let field = |name: &str| value.get(name).and_then(Value::as_str);
                    return Err(WebDriverError::from_w3c_code(
                        code,
                        field("message").unwrap_or_default(),
                        field("stacktrace").map(str::to_owned),
                    ));
                }
            }
            None if status == 200 => return Ok(body),
            None => {}
        }
        Err(WebDriverError::unknown(format!(
            "Did not know what to do with response code '{status}' and response body '{}'",
            excerpt(&body.to_string(), RESPONSE_EXCERPT_LENGTH)
        )))
    }

    /// Proxies an inbound request and returns the answer for the client.
    ///
    /// A `sessionId` in the answer is replaced by the session id of the
    /// inbound URL, or by the downstream id when the URL carries none.
    ///
    /// # Errors
    ///
    /// See [`ProxyClient::proxy`].
    pub async fn proxy_req_res(
        &self,
        inbound_url: &str,
        method: HttpMethod,
        body: Option<Value>,
    ) -> Result<ProxyResponse, WebDriverError> {
        let mut response = self.proxy_command(inbound_url, method, body).await?;
        let carries_session = response
            .body
            .get("sessionId")
            .is_some_and(|id| !matches!(id, Value::Null | Value::Bool(false)) && id != "");
        if carries_session {
            let replacement = inbound_session_id(inbound_url)
                .map(str::to_owned)
                .or_else(|| self.session_id());
            if let (Some(session_id), Some(map)) = (replacement, response.body.as_object_mut()) {
                map.insert("sessionId".to_owned(), Value::String(session_id));
            }
        }
        Ok(response)
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let guard = self.active.register(request.method, &request.url);
        let url = request.url.clone();
        tokio::select! {
            () = guard.token.cancelled() => Err(TransportError::Cancelled { url }),
            result = self.transport.send(request) => result,
        }
    }

    fn command_name(&self, url: &str, method: HttpMethod) -> Option<&'static str> {
        let path = path_of(url);
        self.routes
            .command_name(method, path)
            .or_else(|| {
                let start = endpoint_start(path)?;
                self.routes.command_name(method, path.split_at(start).1)
            })
            .or_else(|| {
                self.routes
                    .command_name(method, &format!("/session/{SESSION_PLACEHOLDER}{path}"))
            })
    }

    /// Records the downstream session id unless one is already established.
    fn capture_session_id(&self, session_id: &str) -> bool {
        let mut state = self.state();
        if state.session_id.is_some() {
            return false;
        }
        state.session_id = Some(session_id.to_owned());
        true
    }

    fn state(&self) -> MutexGuard<'_, DownstreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn actual_error(error: WebDriverError) -> WebDriverError {
    match error.kind() {
        ErrorKind::ProxyRequest => error.into_actual(),
        ErrorKind::UnknownError => error,
        _ => WebDriverError::unknown(error.message().to_owned()).with_source(error),
    }
}

fn request_failed(url: &str, body: Value) -> WebDriverError {
    WebDriverError::proxy_request(
        format!("{PROXY_ERROR_PREFIX} The request to {url} has failed"),
        Some(body),
        Some(500),
    )
}

fn request_body(body: Option<Value>) -> Result<Option<Value>, WebDriverError> {
    match body {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => serde_json::from_str(&text).map(Some).map_err(|error| {
            WebDriverError::unknown(format!(
                "Cannot interpret the request body as valid JSON: {}",
                excerpt(&text, wdrelay_protocol::LOG_OBJ_LENGTH)
            ))
            .with_source(error)
        }),
        Some(other) => Ok(Some(other)),
    }
}

fn excerpt(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

/// Path component of an absolute URL; other input is returned unchanged.
fn path_of(url: &str) -> &str {
    let Some((_, after_scheme)) = url.split_once("://") else {
        return url;
    };
    after_scheme
        .find('/')
        .map_or("/", |start| after_scheme.split_at(start).1)
}

/// Offset of the first `/session` or `/status` segment.
fn endpoint_start(path: &str) -> Option<usize> {
    [path.find("/session"), path.find("/status")]
        .into_iter()
        .flatten()
        .min()
}

fn is_new_session_url(url: &str) -> bool {
    path_of(url)
        .split('?')
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .ends_with("/session")
}

fn created_session_id(body: &Value) -> Option<&str> {
    body.get("sessionId")
        .or_else(|| body.get("value").and_then(|value| value.get("sessionId")))
        .and_then(Value::as_str)
}

fn inbound_session_id(url: &str) -> Option<&str> {
    let path = path_of(url);
    let start = path.find("/session/")?;
    let rest = path.split_at(start).1.strip_prefix("/session/")?;
    rest.split(['/', '?']).next().filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests;
