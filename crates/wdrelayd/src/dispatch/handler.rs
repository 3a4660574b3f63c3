//! Runs one request through routing, validation, the driver and rendering.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use wdrelay_config::{Config, DEFAULT_BASE_PATH};
use wdrelay_protocol::element::{body_has_image_element, path_has_image_element, to_dialect};
use wdrelay_protocol::error::parse_legacy_status;
use wdrelay_protocol::params::{check_params, make_args, prepare_body};
use wdrelay_protocol::routes::is_session_command;
use wdrelay_protocol::validators::validate_command;
use wdrelay_protocol::{
    Dialect, ErrorKind, RouteError, RouteTable, WebDriverError, truncate_for_log,
};

use super::request::InboundRequest;
use super::response::{self, WireResponse};
use super::router::{DISPATCH_TARGET, path_session_id, strip_base_path};
use crate::driver::{CommandOutcome, Driver, DriverFeatures, UNABLE_TO_PROXY};
use crate::sessions::SessionRegistry;

const CREATE_SESSION: &str = "createSession";
const DELETE_SESSION: &str = "deleteSession";

/// An error together with the dialect it should be rendered in, when the
/// dispatcher already knows it.
struct Failure {
    error: WebDriverError,
    dialect: Option<Dialect>,
    http_status: Option<u16>,
}

impl Failure {
    const fn in_dialect(error: WebDriverError, dialect: Option<Dialect>) -> Self {
        Self {
            error,
            dialect,
            http_status: None,
        }
    }

    /// Paths no endpoint knows are answered with 404 in every dialect.
    fn route_miss(error: RouteError) -> Self {
        Self {
            error: error.into(),
            dialect: None,
            http_status: Some(404),
        }
    }
}

impl From<WebDriverError> for Failure {
    fn from(error: WebDriverError) -> Self {
        Self::in_dialect(error, None)
    }
}

/// Turns inbound WebDriver requests into driver calls and wire responses.
///
/// The dispatcher owns the route table and the per-session dialect registry.
/// It never holds a lock across a driver call, so one instance can serve any
/// number of concurrent requests.
#[derive(Debug)]
pub struct Dispatcher<D> {
    driver: D,
    routes: RouteTable,
    sessions: SessionRegistry,
    base_path: String,
    features: DriverFeatures,
}

impl<D: Driver> Dispatcher<D> {
    /// Dispatcher over the standard routes, mounted at the default base path.
    pub fn new(driver: D) -> Self {
        let features = driver.features();
        info!(
            target: DISPATCH_TARGET,
            proxying = features.proxying,
            route_avoidance = features.route_avoidance,
            "driver attached"
        );
        Self {
            driver,
            routes: RouteTable::standard(),
            sessions: SessionRegistry::new(),
            base_path: DEFAULT_BASE_PATH.to_owned(),
            features,
        }
    }

    /// Dispatcher mounted at the configured base path.
    pub fn from_config(driver: D, config: &Config) -> Self {
        Self::new(driver).with_base_path(config.base_path())
    }

    /// Mounts the routes under `base_path`.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Replaces the route table.
    #[must_use]
    pub const fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// The driver commands are sent to.
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Sessions seen so far.
    pub const fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Optional driver members in use.
    pub const fn features(&self) -> DriverFeatures {
        self.features
    }

    /// Base path stripped from inbound paths.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Dispatches a request given as raw transport parts.
    ///
    /// Parts that do not form a request are answered with an error response.
    pub async fn dispatch_raw(&self, method: &str, path: &str, body: &[u8]) -> WireResponse {
        match InboundRequest::parse(method, path, body) {
            Ok(request) => self.dispatch(request).await,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, path, "rejecting unreadable request");
                let session_id = path_session_id(strip_base_path(path, &self.base_path));
                let dialect = self.known_dialect(session_id);
                response::failure(&WebDriverError::from(error), dialect, session_id)
            }
        }
    }

    /// Dispatches `request` and renders the outcome for the wire.
    ///
    /// Every failure, including driver and downstream errors, comes back as
    /// an error envelope in the session's dialect.
    pub async fn dispatch(&self, request: InboundRequest) -> WireResponse {
        let path = strip_base_path(&request.path, &self.base_path).to_owned();
        debug!(
            target: DISPATCH_TARGET,
            method = %request.method,
            path = %path,
            body = %request.body.as_ref().map(truncate_for_log).unwrap_or_default(),
            "dispatching request"
        );
        match self.run(&request, &path).await {
            Ok(response) => response,
            Err(Failure {
                error,
                dialect,
                http_status,
            }) => {
                let session_id = path_session_id(&path);
                let dialect = dialect.or_else(|| self.known_dialect(session_id));
                let error = error.into_actual();
                debug!(
                    target: DISPATCH_TARGET,
                    kind = ?error.kind(),
                    message = error.message(),
                    "request failed"
                );
                let mut response = response::failure(&error, dialect, session_id);
                if let Some(status) = http_status {
                    response.status = status;
                }
                response
            }
        }
    }

    async fn run(&self, request: &InboundRequest, path: &str) -> Result<WireResponse, Failure> {
        let route = match self.routes.lookup(request.method, path) {
            Ok(route) => route,
            Err(error) => return self.unrouted(request, path, error).await,
        };
        let command = route.command_name();
        let session_id = route.session_id();
        if is_session_command(command) {
            let id = session_id.unwrap_or_default();
            self.require_session(id)?;
            if self.should_proxy(id, Some(command), request) {
                return Ok(self.proxy(id, request).await?);
            }
        }

        let payload = &route.spec().payload;
        let dialect = self.known_dialect(session_id);
        let body = prepare_body(
            payload,
            request
                .body
                .clone()
                .unwrap_or_else(|| Value::Object(Map::new())),
        );
        check_params(payload, &body, dialect)?;
        let args = make_args(payload, &body, route.params(), dialect);
        validate_command(command, &args)?;

        let logged_args = truncate_for_log(&Value::Array(args.clone()));
        debug!(
            target: DISPATCH_TARGET,
            command,
            args = %logged_args,
            "executing command"
        );
        let outcome = self.driver.execute_command(command, args).await?;
        let dialect = self.settle_dialect(command, session_id, &outcome);
        self.respond(command, session_id, outcome, dialect)
            .map_err(|error| Failure::in_dialect(error, dialect))
    }

    /// Unsupported endpoints may still be served downstream.
    async fn unrouted(
        &self,
        request: &InboundRequest,
        path: &str,
        error: RouteError,
    ) -> Result<WireResponse, Failure> {
        debug!(target: DISPATCH_TARGET, %error, "no command for request");
        if matches!(error, RouteError::Miss { .. }) {
            return Err(Failure::route_miss(error));
        }
        if let Some(id) = path_session_id(path) {
            self.require_session(id)?;
            if self.should_proxy(id, None, request) {
                return Ok(self.proxy(id, request).await?);
            }
        }
        Err(WebDriverError::from(error).into())
    }

    fn require_session(&self, session_id: &str) -> Result<(), WebDriverError> {
        if self.driver.session_exists(session_id) {
            Ok(())
        } else {
            debug!(target: DISPATCH_TARGET, session_id, "unknown session");
            Err(WebDriverError::no_such_session())
        }
    }

    fn should_proxy(&self, session_id: &str, command: Option<&str>, request: &InboundRequest) -> bool {
        if !self.features.proxying || !self.driver.proxy_active(session_id) {
            return false;
        }
        if command == Some(DELETE_SESSION) {
            return false;
        }
        if self.features.route_avoidance
            && self
                .driver
                .proxy_route_is_avoided(session_id, request.method, &request.path)
        {
            debug!(target: DISPATCH_TARGET, path = %request.path, "route kept local");
            return false;
        }
        if path_has_image_element(&request.path)
            || request.body.as_ref().is_some_and(body_has_image_element)
        {
            debug!(target: DISPATCH_TARGET, path = %request.path, "image element kept local");
            return false;
        }
        true
    }

    async fn proxy(
        &self,
        session_id: &str,
        request: &InboundRequest,
    ) -> Result<WireResponse, WebDriverError> {
        if !self.driver.can_proxy(session_id) {
            return Err(WebDriverError::unknown(UNABLE_TO_PROXY));
        }
        info!(
            target: DISPATCH_TARGET,
            session_id,
            method = %request.method,
            path = %request.path,
            "proxying request downstream"
        );
        let response = self
            .driver
            .proxy_request(request.clone())
            .await
            .map_err(|error| match error.kind() {
                ErrorKind::ProxyRequest => error,
                _ => WebDriverError::unknown(format!(
                    "Could not proxy. Proxy error: {}",
                    error.message()
                ))
                .with_source(error),
            })?;
        debug!(
            target: DISPATCH_TARGET,
            status = response.status,
            body = %truncate_for_log(&response.body),
            "downstream answered"
        );
        Ok(response)
    }

    /// Records what the outcome reveals about the session's dialect and
    /// returns the dialect the response should use.
    fn settle_dialect(
        &self,
        command: &str,
        session_id: Option<&str>,
        outcome: &CommandOutcome,
    ) -> Option<Dialect> {
        let reported = outcome.dialect.or_else(|| self.driver.dialect());
        if command == CREATE_SESSION {
            if let Some(id) = outcome.new_session.as_deref() {
                self.sessions.insert(id, reported);
            }
            return reported;
        }
        match session_id {
            Some(id) => {
                if let Some(dialect) = reported {
                    self.sessions.adopt_dialect(id, dialect);
                }
                self.sessions.dialect(id)
            }
            None => reported,
        }
    }

    fn respond(
        &self,
        command: &str,
        session_id: Option<&str>,
        outcome: CommandOutcome,
        dialect: Option<Dialect>,
    ) -> Result<WireResponse, WebDriverError> {
        let CommandOutcome {
            value, new_session, ..
        } = outcome;
        let mut value = to_dialect(&value.unwrap_or(Value::Null), dialect.unwrap_or(Dialect::Jwp));
        if command == DELETE_SESSION {
            value = Value::Null;
            if let Some(id) = session_id {
                self.sessions.remove(id);
            }
        }
        let new_session = new_session.filter(|_| command == CREATE_SESSION);
        if let Some(error) = embedded_error(&value) {
            if let Some(id) = new_session.as_deref() {
                self.sessions.remove(id);
            }
            return Err(error);
        }
        if new_session.is_some() && dialect == Some(Dialect::W3c) {
            let mut wrapped = Map::new();
            wrapped.insert("capabilities".to_owned(), value);
            value = Value::Object(wrapped);
        }
        debug!(
            target: DISPATCH_TARGET,
            command,
            value = %truncate_for_log(&value),
            "command succeeded"
        );
        Ok(response::success(
            dialect,
            value,
            session_id,
            new_session.as_deref(),
        ))
    }

    fn known_dialect(&self, session_id: Option<&str>) -> Option<Dialect> {
        session_id
            .and_then(|id| self.sessions.dialect(id))
            .or_else(|| self.driver.dialect())
    }
}

/// Error a driver reported inside an otherwise successful result.
fn embedded_error(value: &Value) -> Option<WebDriverError> {
    let map = value.as_object()?;
    if let Some(code) = map.get("status").and_then(parse_legacy_status)
        && code != 0
    {
        return Some(WebDriverError::from_legacy_status(
            code,
            map.get("value").unwrap_or(&Value::Null),
        ));
    }
    let inner = map.get("value")?.as_object()?;
    let code = inner.get("error")?.as_str()?;
    let field = |name: &str| inner.get(name).and_then(Value::as_str).map(str::to_owned);
    Some(WebDriverError::from_w3c_code(
        code,
        field("message").unwrap_or_default(),
        field("stacktrace"),
    ))
}
