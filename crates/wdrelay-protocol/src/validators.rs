//! Semantic checks on marshaled command arguments and request bodies.
//!
//! [`validate_command`] runs after the body has passed its key-set check and
//! has been flattened into the driver argument list. The body-level
//! validators here are wired into the route table through
//! [`PayloadSpec::with_validator`](crate::params::PayloadSpec::with_validator).

use serde_json::{Map, Value};

use crate::dialect::Dialect;
use crate::error::WebDriverError;

const TIMEOUT_TYPES: [&str; 4] = ["script", "implicit", "page load", "command"];
const NETWORK_TYPES: [i64; 5] = [0, 1, 2, 4, 6];
const W3C_TIMEOUT_KEYS: [&str; 3] = ["script", "pageLoad", "implicit"];

static NULL: Value = Value::Null;

/// Validates the argument list for `command`.
///
/// Commands without a dedicated check always pass.
///
/// # Errors
///
/// Returns a `BadParameters` error describing the first invalid argument.
pub fn validate_command(command: &str, args: &[Value]) -> Result<(), WebDriverError> {
    let arg = |index: usize| args.get(index).unwrap_or(&NULL);
    let outcome = match command {
        "setUrl" => check_url(arg(0)),
        "implicitWait" | "asyncScriptTimeout" => check_ms(arg(0)),
        "timeouts" => check_timeouts(arg(0), arg(1), &[arg(2), arg(3), arg(4)]),
        "clickCurrent" => check_button(arg(0)),
        "setNetworkConnection" => check_network_type(arg(0)),
        _ => Ok(()),
    };
    outcome.map_err(WebDriverError::bad_parameters)
}

fn check_url(url: &Value) -> Result<(), String> {
    let valid = url.as_str().is_some_and(|url| {
        url.starts_with("about:") || url.starts_with("data:") || has_scheme(url)
    });
    if valid {
        Ok(())
    } else {
        Err("Url or Uri must start with <scheme>://".to_owned())
    }
}

fn has_scheme(url: &str) -> bool {
    url.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '.' | '-'))
    })
}

fn check_ms(ms: &Value) -> Result<(), String> {
    match ms.as_f64() {
        Some(ms) if ms >= 0.0 => Ok(()),
        _ => Err("Wait ms must be a number equal to 0 or greater".to_owned()),
    }
}

fn check_timeouts(kind: &Value, ms: &Value, w3c: &[&Value]) -> Result<(), String> {
    let present: Vec<&Value> = w3c.iter().copied().filter(|value| !value.is_null()).collect();
    if !present.is_empty() {
        return present.into_iter().try_for_each(check_ms);
    }
    check_ms(ms)?;
    match kind.as_str() {
        Some(kind) if TIMEOUT_TYPES.contains(&kind) => Ok(()),
        Some(kind) => Err(format!("'{kind}' is not a valid timeout type")),
        None => Err(format!("'{kind}' is not a valid timeout type")),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn check_button(button: &Value) -> Result<(), String> {
    if button.is_null() {
        return Ok(());
    }
    match numeric(button) {
        Some(button) if (0.0..=2.0).contains(&button) => Ok(()),
        _ => Err("Click button must be 0, 1, or 2".to_owned()),
    }
}

fn check_network_type(kind: &Value) -> Result<(), String> {
    if kind.as_i64().is_some_and(|kind| NETWORK_TYPES.contains(&kind)) {
        Ok(())
    } else {
        Err("Network type must be one of 0, 1, 2, 4, 6".to_owned())
    }
}

/// Requires a capabilities object in a `createSession` body.
pub(crate) fn validate_new_session(
    body: &Map<String, Value>,
    _dialect: Option<Dialect>,
) -> Option<String> {
    let has_object = |key: &str| body.get(key).is_some_and(Value::is_object);
    if has_object("desiredCapabilities") || has_object("capabilities") {
        None
    } else {
        Some("we require one of \"desiredCapabilities\" or \"capabilities\" object".to_owned())
    }
}

/// Requires the timeout shape of the session's dialect.
///
/// W3C sessions need at least one of `script`, `pageLoad` and `implicit`;
/// JWP sessions need `type` and `ms`. Before the dialect is known either
/// shape is accepted.
pub(crate) fn validate_timeouts(
    body: &Map<String, Value>,
    dialect: Option<Dialect>,
) -> Option<String> {
    let has = |key: &str| body.get(key).is_some_and(|value| !value.is_null());
    let w3c_shape = W3C_TIMEOUT_KEYS.iter().any(|key| has(key));
    let jwp_shape = has("type") && has("ms");
    match dialect {
        Some(Dialect::W3c) if !w3c_shape => Some(
            "W3C protocol expects any of script, pageLoad or implicit to be set".to_owned(),
        ),
        Some(Dialect::Jwp) if !jwp_shape => {
            Some("MJSONWP protocol requires type and ms".to_owned())
        }
        None if !w3c_shape && !jwp_shape => Some(
            "W3C protocol expects any of script, pageLoad or implicit to be set; \
             MJSONWP protocol requires type and ms"
                .to_owned(),
        ),
        _ => None,
    }
}
