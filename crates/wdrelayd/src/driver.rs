//! The seam between the dispatcher and whatever executes commands.
//!
//! A [`Driver`] runs validated commands and may own a downstream proxy. The
//! proxy-related members have defaults so a purely local driver implements
//! only the three required methods; [`DriverFeatures`] tells the dispatcher
//! which of the optional members are worth asking.

use async_trait::async_trait;
use serde_json::Value;
use wdrelay_protocol::{Dialect, HttpMethod, WebDriverError};
use wdrelay_proxy::{HttpTransport, ProxyClient};

use crate::dispatch::{InboundRequest, WireResponse};

/// Message raised when a session claims to proxy without a way to do so.
pub const UNABLE_TO_PROXY: &str = "Trying to proxy to a server but driver is unable to proxy";

/// What a driver hands back after executing a command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutcome {
    /// Command result; `None` renders as `null`.
    pub value: Option<Value>,
    /// Dialect the driver says the result is shaped for.
    pub dialect: Option<Dialect>,
    /// Id of the session a `createSession` call produced.
    pub new_session: Option<String>,
}

impl CommandOutcome {
    /// Outcome carrying `value` and nothing else.
    #[must_use]
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    /// Outcome with no result.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Outcome of a successful `createSession`.
    #[must_use]
    pub fn session_created(session_id: impl Into<String>, capabilities: Value) -> Self {
        Self {
            value: Some(capabilities),
            dialect: None,
            new_session: Some(session_id.into()),
        }
    }

    /// Tags the outcome with the dialect its value is shaped for.
    #[must_use]
    pub const fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }
}

/// Optional driver capabilities, read once by the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverFeatures {
    /// The driver answers `proxy_active`, `can_proxy` and `proxy_request`.
    pub proxying: bool,
    /// The driver answers `proxy_route_is_avoided`.
    pub route_avoidance: bool,
}

impl DriverFeatures {
    /// Features of a driver that proxies everything it is asked to.
    #[must_use]
    pub const fn proxying() -> Self {
        Self {
            proxying: true,
            route_avoidance: false,
        }
    }

    /// Adds route avoidance.
    #[must_use]
    pub const fn with_route_avoidance(mut self) -> Self {
        self.route_avoidance = true;
        self
    }
}

/// Executes WebDriver commands on behalf of the dispatcher.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Runs `command` with the flattened argument list.
    async fn execute_command(
        &self,
        command: &'static str,
        args: Vec<Value>,
    ) -> Result<CommandOutcome, WebDriverError>;

    /// Whether `session_id` names a live session.
    fn session_exists(&self, session_id: &str) -> bool;

    /// Dialect the driver speaks when it is not stated per result.
    fn dialect(&self) -> Option<Dialect>;

    /// Optional members this driver overrides.
    fn features(&self) -> DriverFeatures {
        DriverFeatures::default()
    }

    /// Whether requests for `session_id` should go downstream.
    fn proxy_active(&self, _session_id: &str) -> bool {
        false
    }

    /// Whether the driver owns a proxy for `session_id`.
    fn can_proxy(&self, _session_id: &str) -> bool {
        false
    }

    /// Whether the driver handles `method` on `path` itself while proxying.
    fn proxy_route_is_avoided(&self, _session_id: &str, _method: HttpMethod, _path: &str) -> bool {
        false
    }

    /// Sends the request downstream and returns the answer untouched.
    async fn proxy_request(&self, _request: InboundRequest) -> Result<WireResponse, WebDriverError> {
        Err(WebDriverError::unknown(UNABLE_TO_PROXY))
    }
}

/// Forwards `request` through `client`, for use in [`Driver::proxy_request`].
///
/// # Errors
///
/// Whatever [`ProxyClient::proxy_req_res`] raises.
pub async fn forward<T: HttpTransport>(
    client: &ProxyClient<T>,
    request: InboundRequest,
) -> Result<WireResponse, WebDriverError> {
    let response = client
        .proxy_req_res(&request.path, request.method, request.body)
        .await?;
    Ok(WireResponse::new(response.status, response.body))
}

/// A route a proxying driver keeps for itself.
///
/// Templates are written relative to the base path. A `:name` segment matches
/// any single segment and a trailing `*` matches whatever remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvoidRule {
    method: HttpMethod,
    template: &'static str,
}

impl AvoidRule {
    /// Rule for `method` on paths shaped like `template`.
    #[must_use]
    pub const fn new(method: HttpMethod, template: &'static str) -> Self {
        Self { method, template }
    }

    /// Whether `method` and the relative `path` fall under this rule.
    #[must_use]
    pub fn matches(&self, method: HttpMethod, path: &str) -> bool {
        if method != self.method {
            return false;
        }
        let mut wanted = segments(self.template);
        let mut actual = segments(path);
        loop {
            match (wanted.next(), actual.next()) {
                (Some("*"), _) | (None, None) => return true,
                (Some(expected), Some(segment))
                    if expected.starts_with(':') || expected == segment => {}
                _ => return false,
            }
        }
    }
}

/// The set of routes a proxying driver answers locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvoidList {
    rules: Vec<AvoidRule>,
}

impl AvoidList {
    /// List holding `rules`.
    pub fn new(rules: impl IntoIterator<Item = AvoidRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Whether `method` on `url` matches any rule.
    ///
    /// `url` may be absolute or carry a base path; everything before the
    /// first `session`, `sessions` or `status` segment is ignored.
    #[must_use]
    pub fn is_avoided(&self, method: HttpMethod, url: &str) -> bool {
        let path = endpoint_path(url);
        self.rules.iter().any(|rule| rule.matches(method, path))
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the list holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn endpoint_path(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let mut offset = 0;
    for segment in path.split('/') {
        if matches!(segment, "session" | "sessions" | "status") {
            return path.get(offset..).unwrap_or(path);
        }
        offset += segment.len() + 1;
    }
    path
}
