//! Response envelopes handed back to the transport.

use serde_json::{Value, json};
use wdrelay_protocol::{Dialect, WebDriverError, error_response};

/// HTTP status and JSON body of a dispatched request.
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
}

impl WireResponse {
    /// Response with `status` and `body`.
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// `200 OK` carrying `body`.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// Serialised body, ready for the wire.
    ///
    /// # Errors
    ///
    /// Propagates serialisation failures from `serde_json`.
    pub fn body_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.body)
    }
}

/// Wraps a command result in the envelope of `dialect`.
///
/// An unknown dialect gets the legacy envelope. A `new_session` id is placed
/// inside the W3C value, or at the top of the legacy envelope.
pub(crate) fn success(
    dialect: Option<Dialect>,
    mut value: Value,
    session_id: Option<&str>,
    new_session: Option<&str>,
) -> WireResponse {
    match dialect {
        Some(Dialect::W3c) => {
            if let (Some(id), Some(map)) = (new_session, value.as_object_mut()) {
                map.insert("sessionId".to_owned(), Value::String(id.to_owned()));
            }
            WireResponse::ok(json!({ "value": value }))
        }
        _ => WireResponse::ok(json!({
            "sessionId": new_session.or(session_id),
            "status": 0,
            "value": value,
        })),
    }
}

/// Renders `error` for `dialect`, adding `sessionId` outside the W3C family.
pub(crate) fn failure(
    error: &WebDriverError,
    dialect: Option<Dialect>,
    session_id: Option<&str>,
) -> WireResponse {
    let rendered = error_response(error, dialect);
    let mut body = rendered.body;
    if dialect != Some(Dialect::W3c)
        && let Some(map) = body.as_object_mut()
    {
        map.insert("sessionId".to_owned(), json!(session_id));
    }
    WireResponse::new(rendered.http_status, body)
}
