//! Failures turning raw transport input into an [`InboundRequest`].
//!
//! [`InboundRequest`]: super::InboundRequest

use std::sync::Arc;

use thiserror::Error;
use wdrelay_protocol::{ErrorKind, WebDriverError};

/// Raw request parts the dispatcher cannot interpret.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The HTTP method is not one WebDriver uses.
    #[error("unsupported HTTP method: {method}")]
    UnknownMethod {
        /// Method as received.
        method: String,
    },
    /// The body is not valid JSON.
    #[error("malformed request body: {message}")]
    MalformedBody {
        /// Parser diagnostic.
        message: String,
        #[source]
        source: Arc<serde_json::Error>,
    },
}

impl RequestError {
    pub(crate) fn unknown_method(method: &str) -> Self {
        Self::UnknownMethod {
            method: method.to_owned(),
        }
    }

    pub(crate) fn from_json_error(error: serde_json::Error) -> Self {
        Self::MalformedBody {
            message: error.to_string(),
            source: Arc::new(error),
        }
    }
}

impl From<RequestError> for WebDriverError {
    fn from(error: RequestError) -> Self {
        let kind = match &error {
            RequestError::UnknownMethod { .. } => ErrorKind::UnknownMethod,
            RequestError::MalformedBody { .. } => ErrorKind::InvalidArgument,
        };
        Self::new(kind, error.to_string()).with_source(error)
    }
}
