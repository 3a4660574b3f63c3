//! WebDriver protocol core shared by the dispatcher and the downstream proxy.
//!
//! Two wire dialects coexist: the legacy JSON Wire Protocol and W3C
//! WebDriver. This crate holds everything that is independent of transport:
//!
//! - [`routes`]: the endpoint table and path matching.
//! - [`params`] and [`validators`]: body schemas, argument marshaling and
//!   per-command checks.
//! - [`capabilities`]: the `alwaysMatch`/`firstMatch` algorithm.
//! - [`dialect`] and [`element`]: dialect detection and element-key rewriting.
//! - [`error`]: the error catalog and its dialect-specific renderings.

pub mod capabilities;
pub mod dialect;
pub mod element;
pub mod error;
pub mod params;
pub mod routes;
pub mod validators;

pub use capabilities::{
    CapabilitiesRequest, CapabilityError, CapabilityMatcher, Constraint, Constraints,
    ParsedCapabilities,
};
pub use dialect::{Dialect, DialectTracker, DialectUpdate};
pub use error::{ErrorKind, ErrorResponse, WebDriverError, error_response};
pub use routes::{CommandSpec, HttpMethod, RouteError, RouteMatch, RouteTable};

/// Longest body excerpt written to logs.
pub const LOG_OBJ_LENGTH: usize = 1024;

/// Renders `value` for logs, cut to [`LOG_OBJ_LENGTH`] characters.
#[must_use]
pub fn truncate_for_log(value: &serde_json::Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= LOG_OBJ_LENGTH {
        return rendered;
    }
    let mut cut: String = rendered.chars().take(LOG_OBJ_LENGTH).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests;
