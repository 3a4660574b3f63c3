//! Rendering of errors into dialect-specific response bodies.

use serde_json::{Map, Value, json};

use super::WebDriverError;
use crate::dialect::Dialect;

/// HTTP status and JSON body of an error response.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    /// HTTP status code.
    pub http_status: u16,
    /// Response body. The dispatcher adds `sessionId` where appropriate.
    pub body: Value,
}

/// Renders `error` as `{status, value: {message}}`.
#[must_use]
pub fn jwp_error_response(error: &WebDriverError) -> ErrorResponse {
    ErrorResponse {
        http_status: error.kind().jwp_http_status(),
        body: json!({
            "status": error.legacy_status(),
            "value": { "message": error.message() },
        }),
    }
}

/// Renders `error` as `{value: {error, message, stacktrace}}`.
#[must_use]
pub fn w3c_error_response(error: &WebDriverError) -> ErrorResponse {
    ErrorResponse {
        http_status: error.kind().w3c_http_status(),
        body: json!({
            "value": {
                "error": error.kind().w3c_code(),
                "message": error.message(),
                "stacktrace": error.stacktrace().unwrap_or_default(),
            },
        }),
    }
}

/// Renders `error` for a session speaking `dialect`.
///
/// With no known dialect the body is the legacy body overlaid with the W3C
/// fields, so clients of either family can read it. The legacy HTTP status
/// is used in that case.
#[must_use]
pub fn error_response(error: &WebDriverError, dialect: Option<Dialect>) -> ErrorResponse {
    match dialect {
        Some(Dialect::Jwp) => jwp_error_response(error),
        Some(Dialect::W3c) => w3c_error_response(error),
        None => {
            let jwp = jwp_error_response(error);
            let w3c = w3c_error_response(error);
            let mut body = into_map(jwp.body);
            body.extend(into_map(w3c.body));
            ErrorResponse {
                http_status: jwp.http_status,
                body: Value::Object(body),
            }
        }
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
