//! Route table and path matching for WebDriver commands.
//!
//! Every endpoint either dialect exposes is a [`CommandSpec`]: an HTTP method,
//! a path template with `:named` segments, the driver command it maps to and
//! the body schema the command accepts. Lookup walks the table in declaration
//! order and the first template that matches wins.

mod table;

use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::error::{ErrorKind, WebDriverError};
use crate::params::PayloadSpec;

pub use table::STANDARD_ROUTES;

/// Commands that do not address an existing session.
pub const NO_SESSION_ID_COMMANDS: [&str; 3] = ["createSession", "getStatus", "getSessions"];

/// Whether `command` requires a live session.
#[must_use]
pub fn is_session_command(command: &str) -> bool {
    !NO_SESSION_ID_COMMANDS.contains(&command)
}

/// HTTP methods used by WebDriver endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    /// Read-only command.
    Get,
    /// Command with a JSON body.
    Post,
    /// Removal command.
    Delete,
}

impl HttpMethod {
    /// Whether requests with this method carry a body.
    #[must_use]
    pub const fn has_body(self) -> bool {
        matches!(self, Self::Post)
    }
}

/// One endpoint in the route table.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template relative to the base path, e.g. `/session/:sessionId/url`.
    pub path: &'static str,
    /// Driver command; `None` marks an endpoint that is never implemented.
    pub command: Option<&'static str>,
    /// Body schema.
    pub payload: PayloadSpec,
}

impl CommandSpec {
    /// `GET` endpoint without a body.
    #[must_use]
    pub const fn get(path: &'static str, command: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            command: Some(command),
            payload: PayloadSpec::NONE,
        }
    }

    /// `POST` endpoint with the given body schema.
    #[must_use]
    pub const fn post(path: &'static str, command: &'static str, payload: PayloadSpec) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            command: Some(command),
            payload,
        }
    }

    /// `DELETE` endpoint without a body.
    #[must_use]
    pub const fn delete(path: &'static str, command: &'static str) -> Self {
        Self {
            method: HttpMethod::Delete,
            path,
            command: Some(command),
            payload: PayloadSpec::NONE,
        }
    }

    /// Known endpoint with no command behind it.
    #[must_use]
    pub const fn unsupported(method: HttpMethod, path: &'static str) -> Self {
        Self {
            method,
            path,
            command: None,
            payload: PayloadSpec::NONE,
        }
    }

    fn capture(&self, segments: &[&str]) -> Option<Vec<(&'static str, String)>> {
        let template: Vec<&'static str> = split_path(self.path).collect();
        if template.len() != segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (expected, actual) in template.into_iter().zip(segments) {
            match expected.strip_prefix(':') {
                Some(name) if !actual.is_empty() => params.push((name, (*actual).to_owned())),
                Some(_) => return None,
                None if expected == *actual => {}
                None => return None,
            }
        }
        Some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Strips the query string and any trailing slash from a request path.
#[must_use]
pub fn normalise_path(path: &str) -> &str {
    let path = path.split_once('?').map_or(path, |(path, _)| path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    spec: &'static CommandSpec,
    command: &'static str,
    params: Vec<(&'static str, String)>,
}

impl RouteMatch {
    /// Matched endpoint.
    #[must_use]
    pub const fn spec(&self) -> &'static CommandSpec {
        self.spec
    }

    /// Driver command name.
    #[must_use]
    pub const fn command_name(&self) -> &'static str {
        self.command
    }

    /// Captured URL segments in template order.
    #[must_use]
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Captured segment by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The `:sessionId` segment, when the template has one.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.param("sessionId")
    }
}

/// Lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The path names a known endpoint that has no command for this method.
    #[error("{method} {path} is not implemented")]
    NotImplemented {
        /// Request method.
        method: HttpMethod,
        /// Normalised request path.
        path: String,
    },
    /// No template matches the path.
    #[error("no route for {method} {path}")]
    Miss {
        /// Request method.
        method: HttpMethod,
        /// Normalised request path.
        path: String,
    },
}

impl From<RouteError> for WebDriverError {
    fn from(error: RouteError) -> Self {
        let kind = match &error {
            RouteError::NotImplemented { .. } => ErrorKind::NotImplemented,
            RouteError::Miss { .. } => ErrorKind::UnknownCommand,
        };
        Self::from_kind(kind).with_source(error)
    }
}

/// Immutable, ordered collection of endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RouteTable {
    specs: &'static [CommandSpec],
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RouteTable {
    /// Table over the given endpoints.
    #[must_use]
    pub const fn new(specs: &'static [CommandSpec]) -> Self {
        Self { specs }
    }

    /// Table of every endpoint both dialects define.
    #[must_use]
    pub const fn standard() -> Self {
        Self::new(STANDARD_ROUTES)
    }

    /// All endpoints, in lookup order.
    #[must_use]
    pub const fn specs(&self) -> &'static [CommandSpec] {
        self.specs
    }

    /// Finds the endpoint for `method` and `path`.
    ///
    /// # Errors
    ///
    /// [`RouteError::NotImplemented`] when the path matches a template whose
    /// spec has no command, or matches only under another method;
    /// [`RouteError::Miss`] when no template matches.
    pub fn lookup(&self, method: HttpMethod, path: &str) -> Result<RouteMatch, RouteError> {
        let path = normalise_path(path);
        let segments: Vec<&str> = split_path(path).collect();
        let mut known_path = false;
        for spec in self.specs {
            let Some(params) = spec.capture(&segments) else {
                continue;
            };
            if spec.method != method {
                known_path = true;
                continue;
            }
            return match spec.command {
                Some(command) => Ok(RouteMatch {
                    spec,
                    command,
                    params,
                }),
                None => Err(RouteError::NotImplemented {
                    method,
                    path: path.to_owned(),
                }),
            };
        }
        let path = path.to_owned();
        if known_path {
            Err(RouteError::NotImplemented { method, path })
        } else {
            Err(RouteError::Miss { method, path })
        }
    }

    /// Command name for `method` and `path`, if one is routed.
    #[must_use]
    pub fn command_name(&self, method: HttpMethod, path: &str) -> Option<&'static str> {
        self.lookup(method, path).ok().map(|route| route.command)
    }

    /// Endpoint that serves `command`, for reverse lookups.
    #[must_use]
    pub fn spec_for(&self, command: &str) -> Option<&'static CommandSpec> {
        self.specs
            .iter()
            .find(|spec| spec.command == Some(command))
    }
}

/// Reads the `sessionId` field of a JSON body, if any.
#[must_use]
pub fn body_session_id(body: &Value) -> Option<&str> {
    body.get("sessionId").and_then(Value::as_str)
}

#[cfg(test)]
mod tests;
