//! Parameter schemas and argument marshaling for route commands.
//!
//! A [`PayloadSpec`] describes the JSON body one command accepts: one or more
//! alternative sets of required keys, the optional keys, and whether the body
//! must be wrapped into or unwrapped out of an envelope key first. The
//! dispatcher uses it to reject bad bodies and to flatten good ones into the
//! ordered argument list a driver receives.

use serde_json::{Map, Value, json};

use crate::dialect::Dialect;
use crate::error::WebDriverError;

/// Builds a driver argument list from a validated body.
pub type ArgBuilder = fn(&Map<String, Value>, Option<Dialect>) -> Vec<Value>;

/// Checks a whole body; `Some(message)` rejects it.
pub type BodyValidator = fn(&Map<String, Value>, Option<Dialect>) -> Option<String>;

const IGNORED_KEYS: [&str; 2] = ["sessionId", "id"];

/// Body schema for one command.
#[derive(Debug, Clone, Copy)]
pub struct PayloadSpec {
    /// Alternative required key sets; the body must match one exactly.
    pub required: &'static [&'static [&'static str]],
    /// Keys that may appear in addition to a required set.
    pub optional: &'static [&'static str],
    /// Wraps a non-object body into `{key: body}` before validation.
    pub wrap: Option<&'static str>,
    /// Replaces an object body with its truthy `key` entry before validation.
    pub unwrap: Option<&'static str>,
    /// Custom argument builder replacing the default flattening.
    pub make_args: Option<ArgBuilder>,
    /// Body-level check run before required-key matching.
    pub validate: Option<BodyValidator>,
}

impl PayloadSpec {
    /// A command that takes no body parameters.
    pub const NONE: Self = Self {
        required: &[],
        optional: &[],
        wrap: None,
        unwrap: None,
        make_args: None,
        validate: None,
    };

    /// Requires exactly one of the given key sets.
    #[must_use]
    pub const fn required(sets: &'static [&'static [&'static str]]) -> Self {
        Self {
            required: sets,
            ..Self::NONE
        }
    }

    /// Accepts only optional keys.
    #[must_use]
    pub const fn optional(keys: &'static [&'static str]) -> Self {
        Self {
            optional: keys,
            ..Self::NONE
        }
    }

    /// Adds optional keys.
    #[must_use]
    pub const fn with_optional(self, keys: &'static [&'static str]) -> Self {
        Self {
            optional: keys,
            ..self
        }
    }

    /// Wraps the raw body under `key`.
    #[must_use]
    pub const fn wrapped(self, key: &'static str) -> Self {
        Self {
            wrap: Some(key),
            ..self
        }
    }

    /// Unwraps the body from under `key` when present.
    #[must_use]
    pub const fn unwrapped(self, key: &'static str) -> Self {
        Self {
            unwrap: Some(key),
            ..self
        }
    }

    /// Uses a custom argument builder.
    #[must_use]
    pub const fn with_args(self, builder: ArgBuilder) -> Self {
        Self {
            make_args: Some(builder),
            ..self
        }
    }

    /// Adds a body-level validator.
    #[must_use]
    pub const fn with_validator(self, validator: BodyValidator) -> Self {
        Self {
            validate: Some(validator),
            ..self
        }
    }

    /// Whether the command reads anything from the body.
    #[must_use]
    pub const fn takes_body(&self) -> bool {
        !self.required.is_empty()
            || !self.optional.is_empty()
            || self.make_args.is_some()
            || self.validate.is_some()
    }
}

/// Wraps a scalar, array or null `body` as `{key: body}`.
///
/// Objects pass through untouched.
#[must_use]
pub fn wrap_params(body: Value, key: &str) -> Value {
    if body.is_object() {
        return body;
    }
    json!({ key: body })
}

/// Replaces an object body by its `key` entry when that entry is truthy.
///
/// Truthy here means neither null nor `false`. Other bodies pass through.
#[must_use]
pub fn unwrap_params(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) => match map.remove(key) {
            Some(inner) if !matches!(inner, Value::Null | Value::Bool(false)) => inner,
            Some(inner) => {
                map.insert(key.to_owned(), inner);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Applies the payload's wrap or unwrap rule.
#[must_use]
pub fn prepare_body(spec: &PayloadSpec, body: Value) -> Value {
    let body = match spec.wrap {
        Some(key) => wrap_params(body, key),
        None => body,
    };
    match spec.unwrap {
        Some(key) => unwrap_params(body, key),
        None => body,
    }
}

/// Validates a prepared body against the payload schema.
///
/// The body-level validator runs first. Then some required set must be fully
/// present, with no other keys besides the declared optionals, `sessionId`
/// and `id`.
///
/// # Errors
///
/// Returns a `BadParameters` error naming the accepted sets and the received
/// keys.
pub fn check_params(
    spec: &PayloadSpec,
    body: &Value,
    dialect: Option<Dialect>,
) -> Result<(), WebDriverError> {
    let empty = Map::new();
    let map = body.as_object().unwrap_or(&empty);
    if let Some(validate) = spec.validate
        && let Some(message) = validate(map, dialect)
    {
        return Err(WebDriverError::bad_parameters(message));
    }
    if spec.required.is_empty() {
        return Ok(());
    }
    let received: Vec<&str> = map.keys().map(String::as_str).collect();
    let matches = spec.required.iter().any(|set| {
        let unexpected = received.iter().any(|key| {
            !set.contains(key) && !spec.optional.contains(key) && !IGNORED_KEYS.contains(key)
        });
        let missing = set.iter().any(|key| !received.contains(key));
        !unexpected && !missing
    });
    if matches {
        return Ok(());
    }
    let wanted = json!({
        "required": spec.required,
        "optional": spec.optional,
    });
    Err(WebDriverError::bad_parameters(format!(
        "Parameters were incorrect. We wanted {wanted} and you sent {}",
        json!(received)
    )))
}

/// Flattens a validated body and URL params into the driver's argument list.
///
/// Order: the custom builder's output, or the first required set whose keys
/// are all present; then each optional key (null when absent); then the URL
/// params in reverse declaration order.
#[must_use]
pub fn make_args(
    spec: &PayloadSpec,
    body: &Value,
    url_params: &[(&str, String)],
    dialect: Option<Dialect>,
) -> Vec<Value> {
    let empty = Map::new();
    let map = body.as_object().unwrap_or(&empty);
    let mut args = match spec.make_args {
        Some(builder) => builder(map, dialect),
        None => {
            let mut args: Vec<Value> = spec
                .required
                .iter()
                .find(|set| set.iter().all(|key| map.contains_key(*key)))
                .map(|set| set.iter().map(|key| map[*key].clone()).collect())
                .unwrap_or_default();
            args.extend(
                spec.optional
                    .iter()
                    .map(|key| map.get(*key).cloned().unwrap_or(Value::Null)),
            );
            args
        }
    };
    args.extend(
        url_params
            .iter()
            .rev()
            .map(|(_, value)| Value::String(value.clone())),
    );
    args
}
