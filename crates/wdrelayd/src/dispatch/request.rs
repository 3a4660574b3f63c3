//! Inbound requests as the transport hands them over.

use serde_json::Value;
use wdrelay_protocol::HttpMethod;

use super::errors::RequestError;

/// One client request, before routing.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path including the base path and any query string.
    pub path: String,
    /// Decoded JSON body; `None` when the request carried none.
    pub body: Option<Value>,
}

impl InboundRequest {
    /// Request without a body.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// `GET` on `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// `POST` of `body` to `path`.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    /// `DELETE` on `path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds a request from raw transport parts.
    ///
    /// The method is matched case-insensitively. A body that is empty once
    /// whitespace is trimmed counts as absent.
    ///
    /// # Errors
    ///
    /// [`RequestError::UnknownMethod`] for methods WebDriver does not use and
    /// [`RequestError::MalformedBody`] when the body is not JSON.
    pub fn parse(method: &str, path: &str, body: &[u8]) -> Result<Self, RequestError> {
        let method: HttpMethod = method
            .trim()
            .parse()
            .map_err(|_| RequestError::unknown_method(method))?;
        let trimmed = body.trim_ascii();
        let body = if trimmed.is_empty() {
            None
        } else {
            Some(serde_json::from_slice(trimmed).map_err(RequestError::from_json_error)?)
        };
        Ok(Self {
            method,
            path: path.to_owned(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_method_path_and_body() {
        let request = InboundRequest::parse("post", "/wd/hub/session", br#"{"a":1}"#)
            .expect("request should parse");
        assert_eq!(request, InboundRequest::post("/wd/hub/session", json!({"a": 1})));
    }

    #[rstest]
    #[case::empty(b"")]
    #[case::whitespace(b" \r\n")]
    fn blank_body_is_absent(#[case] body: &[u8]) {
        let request = InboundRequest::parse("GET", "/status", body).expect("request should parse");
        assert_eq!(request.body, None);
    }

    #[test]
    fn rejects_unknown_method() {
        let error = InboundRequest::parse("PATCH", "/status", b"").expect_err("PATCH is unused");
        assert!(matches!(error, RequestError::UnknownMethod { method } if method == "PATCH"));
    }

    #[test]
    fn rejects_malformed_body() {
        let error =
            InboundRequest::parse("POST", "/session", b"{not json").expect_err("body is invalid");
        assert!(matches!(error, RequestError::MalformedBody { .. }));
    }
}
