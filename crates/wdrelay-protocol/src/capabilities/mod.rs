//! W3C capability processing for session creation.
//!
//! A new-session request carries `alwaysMatch`, capabilities every candidate
//! must have, and `firstMatch`, an ordered list of alternatives. The matcher
//! validates both against a [`Constraints`] schema and merges `alwaysMatch`
//! with the first alternative that validates and shares no key with it.
//!
//! Shape errors and `alwaysMatch` violations are raised. A `firstMatch` entry
//! that fails validation is only logged and skipped.

mod constraints;

use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use crate::error::{ErrorKind, WebDriverError};

pub use constraints::{Constraint, Constraints, Presence, ValueType, validate_capabilities};

/// Tracing target for capability processing.
pub(crate) const CAPS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::caps");

/// Errors raised while processing capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The request root was not an object.
    #[error(
        "The capabilities argument was not valid for the following reason(s): \"capabilities\" must be a JSON object."
    )]
    InvalidRoot,
    /// `firstMatch` was neither an array nor absent.
    #[error(
        "The firstMatch argument was not valid for the following reason(s): \"firstMatch\" must be a JSON array or undefined"
    )]
    InvalidFirstMatch,
    /// A capability map was not an object.
    #[error("must be a JSON object")]
    NotAnObject,
    /// One or more constraint rules failed.
    #[error("{}.", .0.join(", "))]
    Violations(Vec<String>),
    /// A key appeared in both maps being merged.
    #[error("property {name} should not exist on both primary and secondary")]
    Collision {
        /// Colliding capability name.
        name: String,
    },
}

impl From<CapabilityError> for WebDriverError {
    fn from(error: CapabilityError) -> Self {
        Self::new(ErrorKind::InvalidArgument, error.to_string()).with_source(error)
    }
}

/// Merges `secondary` into a copy of `primary`.
///
/// # Errors
///
/// [`CapabilityError::Collision`] when both maps define the same key.
pub fn merge_capabilities(
    primary: &Map<String, Value>,
    secondary: &Map<String, Value>,
) -> Result<Map<String, Value>, CapabilityError> {
    let mut merged = primary.clone();
    for (name, value) in secondary {
        if primary.contains_key(name) {
            return Err(CapabilityError::Collision { name: name.clone() });
        }
        merged.insert(name.clone(), value.clone());
    }
    Ok(merged)
}

/// Raw capabilities object from a new-session request.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilitiesRequest {
    raw: Value,
}

impl CapabilitiesRequest {
    /// Wraps an `{alwaysMatch, firstMatch}` object.
    #[must_use]
    pub const fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Extracts the capabilities object from a `createSession` body.
    ///
    /// A W3C `capabilities` object is used as-is. Otherwise legacy
    /// `desiredCapabilities`, overlaid with any `requiredCapabilities`, becomes
    /// `alwaysMatch` with a single empty `firstMatch` entry.
    #[must_use]
    pub fn from_session_body(body: &Value) -> Option<Self> {
        if let Some(capabilities) = body.get("capabilities").filter(|value| value.is_object()) {
            return Some(Self::new(capabilities.clone()));
        }
        let desired = body.get("desiredCapabilities").and_then(Value::as_object)?;
        let mut always_match = desired.clone();
        if let Some(required) = body.get("requiredCapabilities").and_then(Value::as_object) {
            always_match.extend(required.clone());
        }
        Some(Self::new(json!({
            "alwaysMatch": always_match,
            "firstMatch": [{}],
        })))
    }

    /// The wrapped JSON.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.raw
    }
}

/// Every intermediate product of capability processing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCapabilities {
    /// Validated `alwaysMatch`.
    pub always_match: Map<String, Value>,
    /// `firstMatch` as received.
    pub all_first_match: Vec<Value>,
    /// `firstMatch` entries that passed validation, in order.
    pub validated_first_match: Vec<Map<String, Value>>,
    /// Final capabilities.
    pub matched: Map<String, Value>,
}

/// Runs the `alwaysMatch`/`firstMatch` algorithm against a schema.
#[derive(Debug, Clone)]
pub struct CapabilityMatcher {
    constraints: Constraints,
    relax_first_match_presence: bool,
    validate_first_match: bool,
}

impl CapabilityMatcher {
    /// Matcher enforcing `constraints`.
    #[must_use]
    pub fn new(constraints: Constraints) -> Self {
        Self {
            constraints,
            relax_first_match_presence: true,
            validate_first_match: true,
        }
    }

    /// Whether `firstMatch` entries may rely on `alwaysMatch` for required keys.
    #[must_use]
    pub fn relax_first_match_presence(mut self, relax: bool) -> Self {
        self.relax_first_match_presence = relax;
        self
    }

    /// Accepts every object `firstMatch` entry without checking constraints.
    #[must_use]
    pub fn without_first_match_validation(mut self) -> Self {
        self.validate_first_match = false;
        self
    }

    /// Schema in force.
    #[must_use]
    pub const fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Processes `request` and keeps every intermediate result.
    ///
    /// # Errors
    ///
    /// Shape errors and `alwaysMatch` violations.
    pub fn parse(&self, request: &Value) -> Result<ParsedCapabilities, CapabilityError> {
        let root = request.as_object().ok_or(CapabilityError::InvalidRoot)?;
        let always_match = root
            .get("alwaysMatch")
            .filter(|value| value.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let always_match =
            validate_capabilities(&always_match, &self.constraints, Presence::Relaxed)?;

        let all_first_match = match root.get("firstMatch") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries.clone(),
            Some(_) => return Err(CapabilityError::InvalidFirstMatch),
        };

        let validated_first_match: Vec<Map<String, Value>> = all_first_match
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match self.validate_entry(entry, &always_match) {
                Ok(map) => Some(map),
                Err(error) => {
                    debug!(
                        target: CAPS_TARGET,
                        index,
                        %error,
                        "skipping firstMatch entry"
                    );
                    None
                }
            })
            .collect();

        let matched = validated_first_match
            .iter()
            .find_map(|entry| merge_capabilities(&always_match, entry).ok())
            .unwrap_or_else(|| always_match.clone());

        Ok(ParsedCapabilities {
            always_match,
            all_first_match,
            validated_first_match,
            matched,
        })
    }

    /// Processes `request` and returns the matched capabilities.
    ///
    /// # Errors
    ///
    /// See [`CapabilityMatcher::parse`].
    pub fn process(&self, request: &Value) -> Result<Map<String, Value>, CapabilityError> {
        self.parse(request).map(|parsed| parsed.matched)
    }

    fn validate_entry(
        &self,
        entry: &Value,
        always_match: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CapabilityError> {
        if !self.validate_first_match {
            return entry.as_object().cloned().ok_or(CapabilityError::NotAnObject);
        }
        let presence = if self.relax_first_match_presence {
            Presence::SuppliedBy(always_match)
        } else {
            Presence::Enforced
        };
        validate_capabilities(entry, &self.constraints, presence)
    }
}

#[cfg(test)]
mod tests;
