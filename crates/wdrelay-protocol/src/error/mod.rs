//! Canonical WebDriver error kinds and their wire mappings.
//!
//! Every failure that leaves the protocol core is a [`WebDriverError`]. Its
//! [`ErrorKind`] fixes the legacy JSON Wire Protocol status code, the W3C error
//! string and the HTTP status used by each dialect, so the two families never
//! leak into each other. Errors decoded from a backend keep the status code the
//! backend reported.
//!
//! Proxy failures are special: a [`ErrorKind::ProxyRequest`] error carries the
//! downstream body and HTTP status, and [`WebDriverError::into_actual`] recovers
//! the backend's own error from them before the error is rendered.

mod wire;

use std::error::Error as StdError;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use self::wire::{ErrorResponse, error_response, jwp_error_response, w3c_error_response};

/// Catalog of error kinds understood by both dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The session id does not name a live session.
    NoSuchSession,
    /// No element matched the locator.
    NoSuchElement,
    /// The frame to switch to does not exist.
    NoSuchFrame,
    /// The endpoint is not a WebDriver command.
    UnknownCommand,
    /// The element is no longer attached to the document.
    StaleElementReference,
    /// The element is not visible.
    ElementNotVisible,
    /// The element is in a state that forbids the command.
    InvalidElementState,
    /// Catch-all server-side failure.
    UnknownError,
    /// The element cannot be selected.
    ElementIsNotSelectable,
    /// User-supplied script raised.
    JavaScriptError,
    /// XPath evaluation failed.
    XPathLookupError,
    /// An operation ran past its deadline.
    Timeout,
    /// The window to switch to does not exist.
    NoSuchWindow,
    /// Cookie domain differs from the current page.
    InvalidCookieDomain,
    /// Setting a cookie failed.
    UnableToSetCookie,
    /// A modal dialog blocks the command.
    UnexpectedAlertOpen,
    /// No modal dialog is open.
    NoAlertOpen,
    /// A script ran past its deadline.
    ScriptTimeout,
    /// Interaction coordinates are invalid.
    InvalidElementCoordinates,
    /// IME is not available.
    ImeNotAvailable,
    /// IME engine could not be activated.
    ImeEngineActivationFailed,
    /// The selector is malformed.
    InvalidSelector,
    /// The backend refused to create a session.
    SessionNotCreated,
    /// A move action targets a point outside the viewport.
    MoveTargetOutOfBounds,
    /// A command argument is invalid.
    InvalidArgument,
    /// The element cannot be interacted with.
    ElementNotInteractable,
    /// Another element would receive the click.
    ElementClickIntercepted,
    /// The certificate is not trusted.
    InsecureCertificate,
    /// No cookie matched the name.
    NoSuchCookie,
    /// Taking a screenshot failed.
    UnableToCaptureScreen,
    /// The HTTP method is not supported for the endpoint.
    UnknownMethod,
    /// The backend does not support the operation.
    UnsupportedOperation,
    /// The command exists but has not been written yet.
    NotYetImplemented,
    /// The command will never be implemented.
    NotImplemented,
    /// The request body does not fit the command's parameter schema.
    BadParameters,
    /// A downstream request failed; see [`WebDriverError::into_actual`].
    ProxyRequest,
}

/// Legacy status, W3C error string, W3C HTTP status and summary for one kind.
struct KindInfo {
    legacy_status: i64,
    w3c_code: &'static str,
    w3c_http_status: u16,
    summary: &'static str,
}

const fn info(
    legacy_status: i64,
    w3c_code: &'static str,
    w3c_http_status: u16,
    summary: &'static str,
) -> KindInfo {
    KindInfo {
        legacy_status,
        w3c_code,
        w3c_http_status,
        summary,
    }
}

const UNKNOWN_ERROR_STATUS: i64 = 13;

impl ErrorKind {
    /// Every kind, in catalog order.
    pub const ALL: [Self; 36] = [
        Self::NoSuchSession,
        Self::NoSuchElement,
        Self::NoSuchFrame,
        Self::UnknownCommand,
        Self::StaleElementReference,
        Self::ElementNotVisible,
        Self::InvalidElementState,
        Self::UnknownError,
        Self::ElementIsNotSelectable,
        Self::JavaScriptError,
        Self::XPathLookupError,
        Self::Timeout,
        Self::NoSuchWindow,
        Self::InvalidCookieDomain,
        Self::UnableToSetCookie,
        Self::UnexpectedAlertOpen,
        Self::NoAlertOpen,
        Self::ScriptTimeout,
        Self::InvalidElementCoordinates,
        Self::ImeNotAvailable,
        Self::ImeEngineActivationFailed,
        Self::InvalidSelector,
        Self::SessionNotCreated,
        Self::MoveTargetOutOfBounds,
        Self::InvalidArgument,
        Self::ElementNotInteractable,
        Self::ElementClickIntercepted,
        Self::InsecureCertificate,
        Self::NoSuchCookie,
        Self::UnableToCaptureScreen,
        Self::UnknownMethod,
        Self::UnsupportedOperation,
        Self::NotYetImplemented,
        Self::NotImplemented,
        Self::BadParameters,
        Self::ProxyRequest,
    ];

    const fn info(self) -> KindInfo {
        match self {
            Self::NoSuchSession => info(
                6,
                "invalid session id",
                404,
                "A session is either terminated or not started",
            ),
            Self::NoSuchElement => info(
                7,
                "no such element",
                404,
                "An element could not be located on the page using the given search parameters.",
            ),
            Self::NoSuchFrame => info(
                8,
                "no such frame",
                404,
                "A request to switch to a frame could not be satisfied because the frame could not be found.",
            ),
            Self::UnknownCommand => info(
                9,
                "unknown command",
                404,
                "The requested resource could not be found, or a request was received using an HTTP method that is not supported by the mapped resource.",
            ),
            Self::StaleElementReference => info(
                10,
                "stale element reference",
                404,
                "An element command failed because the referenced element is no longer attached to the DOM.",
            ),
            Self::ElementNotVisible => info(
                11,
                "element not visible",
                400,
                "An element command could not be completed because the element is not visible on the page.",
            ),
            Self::InvalidElementState => info(
                12,
                "invalid element state",
                400,
                "An element command could not be completed because the element is in an invalid state (e.g. attempting to click a disabled element).",
            ),
            Self::UnknownError => info(
                UNKNOWN_ERROR_STATUS,
                "unknown error",
                500,
                "An unknown server-side error occurred while processing the command.",
            ),
            Self::ElementIsNotSelectable => info(
                15,
                "element not selectable",
                400,
                "An attempt was made to select an element that cannot be selected.",
            ),
            Self::JavaScriptError => info(
                17,
                "javascript error",
                500,
                "An error occurred while executing user supplied JavaScript.",
            ),
            Self::XPathLookupError => info(
                19,
                "invalid selector",
                400,
                "An error occurred while searching for an element by XPath.",
            ),
            Self::Timeout => info(
                21,
                "timeout",
                408,
                "An operation did not complete before its timeout expired.",
            ),
            Self::NoSuchWindow => info(
                23,
                "no such window",
                404,
                "A request to switch to a different window could not be satisfied because the window could not be found.",
            ),
            Self::InvalidCookieDomain => info(
                24,
                "invalid cookie domain",
                400,
                "An illegal attempt was made to set a cookie under a different domain than the current page.",
            ),
            Self::UnableToSetCookie => info(
                25,
                "unable to set cookie",
                500,
                "A request to set a cookie's value could not be satisfied.",
            ),
            Self::UnexpectedAlertOpen => info(
                26,
                "unexpected alert open",
                500,
                "A modal dialog was open, blocking this operation",
            ),
            Self::NoAlertOpen => info(
                27,
                "no such alert",
                404,
                "An attempt was made to operate on a modal dialog when one was not open.",
            ),
            Self::ScriptTimeout => info(
                28,
                "script timeout",
                408,
                "A script did not complete before its timeout expired.",
            ),
            Self::InvalidElementCoordinates => info(
                29,
                "invalid coordinates",
                400,
                "The coordinates provided to an interactions operation are invalid.",
            ),
            Self::ImeNotAvailable => info(30, "unsupported operation", 500, "IME was not available."),
            Self::ImeEngineActivationFailed => info(
                31,
                "unsupported operation",
                500,
                "An IME engine could not be started.",
            ),
            Self::InvalidSelector => info(
                32,
                "invalid selector",
                400,
                "Argument was an invalid selector (e.g. XPath/CSS).",
            ),
            Self::SessionNotCreated => info(
                33,
                "session not created",
                500,
                "A new session could not be created.",
            ),
            Self::MoveTargetOutOfBounds => info(
                34,
                "move target out of bounds",
                500,
                "Target provided for a move action is out of bounds.",
            ),
            Self::InvalidArgument => info(
                61,
                "invalid argument",
                400,
                "The arguments passed to the command are either invalid or malformed",
            ),
            Self::ElementNotInteractable => info(
                60,
                "element not interactable",
                400,
                "A command could not be completed because the element is not pointer- or keyboard interactable.",
            ),
            Self::ElementClickIntercepted => info(
                64,
                "element click intercepted",
                400,
                "The Element Click command could not be completed because the element receiving the events is obscuring the element that was requested clicked",
            ),
            Self::InsecureCertificate => info(
                UNKNOWN_ERROR_STATUS,
                "insecure certificate",
                400,
                "Navigation caused the user agent to hit a certificate warning, which is usually the result of an expired or invalid TLS certificate",
            ),
            Self::NoSuchCookie => info(
                62,
                "no such cookie",
                404,
                "No cookie matching the given path name was found amongst the associated cookies of the current browsing context's active document",
            ),
            Self::UnableToCaptureScreen => info(
                63,
                "unable to capture screen",
                500,
                "A screen capture was made impossible",
            ),
            Self::UnknownMethod => info(
                405,
                "unknown method",
                405,
                "The requested command matched a known URL but did not match an method for that URL",
            ),
            Self::UnsupportedOperation => info(
                UNKNOWN_ERROR_STATUS,
                "unsupported operation",
                500,
                "A server-side error occurred. Command cannot be supported.",
            ),
            Self::NotYetImplemented => info(
                UNKNOWN_ERROR_STATUS,
                "unknown method",
                404,
                "Method has not yet been implemented",
            ),
            Self::NotImplemented => info(
                UNKNOWN_ERROR_STATUS,
                "unknown method",
                405,
                "Method is not implemented",
            ),
            Self::BadParameters => info(
                UNKNOWN_ERROR_STATUS,
                "invalid argument",
                400,
                "Parameters were incorrect",
            ),
            Self::ProxyRequest => info(
                UNKNOWN_ERROR_STATUS,
                "unknown error",
                500,
                "The request to the downstream server has failed",
            ),
        }
    }

    /// Status code used in legacy `{status, value}` envelopes.
    #[must_use]
    pub const fn legacy_status(self) -> i64 {
        self.info().legacy_status
    }

    /// Error string used in W3C `{value:{error}}` envelopes.
    #[must_use]
    pub const fn w3c_code(self) -> &'static str {
        self.info().w3c_code
    }

    /// HTTP status used for W3C error responses.
    #[must_use]
    pub const fn w3c_http_status(self) -> u16 {
        self.info().w3c_http_status
    }

    /// HTTP status used for legacy error responses.
    #[must_use]
    pub const fn jwp_http_status(self) -> u16 {
        match self {
            Self::BadParameters => 400,
            Self::NoSuchSession => 404,
            Self::NotYetImplemented | Self::NotImplemented => 501,
            _ => 500,
        }
    }

    /// Summary used when no message is available.
    #[must_use]
    pub const fn summary(self) -> &'static str {
        self.info().summary
    }

    /// Decodes a legacy status code reported by a backend.
    ///
    /// Codes shared by several kinds, and unknown codes, decode to
    /// [`ErrorKind::UnknownError`].
    #[must_use]
    pub fn from_legacy_status(code: i64) -> Self {
        if code == UNKNOWN_ERROR_STATUS {
            return Self::UnknownError;
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.legacy_status() == code)
            .unwrap_or(Self::UnknownError)
    }

    /// Decodes a W3C error string reported by a backend.
    ///
    /// Strings shared by several kinds decode to the most general of them;
    /// unknown strings decode to [`ErrorKind::UnknownError`].
    #[must_use]
    pub fn from_w3c_code(code: &str) -> Self {
        let wanted = code.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "invalid selector" => return Self::InvalidSelector,
            "unsupported operation" => return Self::UnsupportedOperation,
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.w3c_code() == wanted)
            .unwrap_or(Self::UnknownError)
    }
}

/// Downstream response attached to a proxy failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownstreamFailure {
    /// Parsed response body, or the raw text wrapped in a JSON string.
    pub body: Option<Value>,
    /// HTTP status of the downstream response, when one arrived.
    pub http_status: Option<u16>,
}

/// An error on its way to the client.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct WebDriverError {
    kind: ErrorKind,
    message: String,
    legacy_status: Option<i64>,
    stacktrace: Option<String>,
    downstream: Option<DownstreamFailure>,
    #[source]
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl WebDriverError {
    /// Creates an error of `kind`; an empty message falls back to the summary.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind,
            message: if message.is_empty() {
                kind.summary().to_owned()
            } else {
                message
            },
            legacy_status: None,
            stacktrace: None,
            downstream: None,
            source: None,
        }
    }

    /// Creates an error of `kind` carrying the kind's summary.
    #[must_use]
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind, kind.summary())
    }

    /// The session id is unknown.
    #[must_use]
    pub fn no_such_session() -> Self {
        Self::from_kind(ErrorKind::NoSuchSession)
    }

    /// The endpoint is known but has no command behind it.
    #[must_use]
    pub fn not_implemented() -> Self {
        Self::from_kind(ErrorKind::NotImplemented)
    }

    /// The request body is invalid for the command.
    pub fn bad_parameters(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadParameters, message)
    }

    /// Catch-all server-side failure.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownError, message)
    }

    /// A downstream call failed.
    ///
    /// `body` and `http_status` describe whatever the backend answered, if it
    /// answered at all.
    pub fn proxy_request(
        message: impl Into<String>,
        body: Option<Value>,
        http_status: Option<u16>,
    ) -> Self {
        let mut error = Self::new(ErrorKind::ProxyRequest, message);
        error.downstream = Some(DownstreamFailure { body, http_status });
        error
    }

    /// Decodes a legacy `{status, value}` failure.
    ///
    /// The message is `value.message` when `value` is an object, the string
    /// itself when it is a string, and the kind's summary otherwise. The
    /// reported code is kept even when it decodes to a generic kind.
    #[must_use]
    pub fn from_legacy_status(code: i64, value: &Value) -> Self {
        let kind = ErrorKind::from_legacy_status(code);
        let mut error = Self::new(kind, legacy_message(value));
        error.legacy_status = Some(code);
        error
    }

    /// Decodes a W3C `{error, message, stacktrace}` failure.
    pub fn from_w3c_code(
        code: &str,
        message: impl Into<String>,
        stacktrace: Option<String>,
    ) -> Self {
        let mut error = Self::new(ErrorKind::from_w3c_code(code), message);
        error.stacktrace = stacktrace;
        error
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Attaches a stack trace rendered in W3C error bodies.
    #[must_use]
    pub fn with_stacktrace(mut self, stacktrace: impl Into<String>) -> Self {
        self.stacktrace = Some(stacktrace.into());
        self
    }

    /// Error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Legacy status code: the backend's own code when decoded, else the kind's.
    #[must_use]
    pub fn legacy_status(&self) -> i64 {
        self.legacy_status
            .unwrap_or_else(|| self.kind.legacy_status())
    }

    /// Stack trace, when one was supplied.
    #[must_use]
    pub fn stacktrace(&self) -> Option<&str> {
        self.stacktrace.as_deref()
    }

    /// Downstream response attached to a proxy failure.
    #[must_use]
    pub const fn downstream(&self) -> Option<&DownstreamFailure> {
        self.downstream.as_ref()
    }

    /// Recovers the backend's own error from a proxy failure.
    ///
    /// A downstream body with `status` and `value` decodes as a legacy error; a
    /// body whose `value.error` is set, answered with HTTP 300 or above, decodes
    /// as a W3C error. Any other proxy failure becomes an unknown error with the
    /// proxy message. Errors of other kinds are returned unchanged.
    #[must_use]
    pub fn into_actual(self) -> Self {
        if self.kind != ErrorKind::ProxyRequest {
            return self;
        }
        let failure = self.downstream.clone().unwrap_or_default();
        if let Some(body) = failure.body.as_ref().and_then(Value::as_object) {
            let status = body.get("status").and_then(parse_legacy_status);
            let value = body.get("value").filter(|value| !value.is_null());
            if let (Some(code), Some(value)) = (status, value) {
                return Self::from_legacy_status(code, value).with_cause_of(self);
            }
            let w3c = value
                .and_then(Value::as_object)
                .filter(|_| failure.http_status.is_some_and(|status| status >= 300));
            if let Some(code) = w3c.and_then(|value| value.get("error")).and_then(Value::as_str) {
                let field = |name: &str| {
                    w3c.and_then(|value| value.get(name))
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                };
                let message = field("message").unwrap_or_else(|| self.message.clone());
                return Self::from_w3c_code(code, message, field("stacktrace")).with_cause_of(self);
            }
        }
        let message = self.message.clone();
        Self::unknown(message).with_cause_of(self)
    }

    fn with_cause_of(mut self, cause: Self) -> Self {
        self.source = Some(Arc::new(cause));
        self
    }
}

/// Reads a legacy status that may arrive as a number or a numeric string.
#[must_use]
pub fn parse_legacy_status(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn legacy_message(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(text)) => text.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => String::new(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
