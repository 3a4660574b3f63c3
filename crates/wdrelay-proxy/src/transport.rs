//! HTTP transport seam between the proxy client and the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;
use thiserror::Error;
use wdrelay_config::Config;
use wdrelay_protocol::HttpMethod;

const USER_AGENT_VALUE: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// One downstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute downstream URL.
    pub url: String,
    /// JSON body; never set for `GET`.
    pub body: Option<Value>,
}

/// Raw downstream answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as received.
    pub body: String,
}

impl TransportResponse {
    /// Response with the given status and body text.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failures below the HTTP layer.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] Arc<reqwest::Error>),
    /// The backend could not be reached.
    #[error("could not connect to {url}: {source}")]
    Connect {
        /// Target URL.
        url: String,
        /// Underlying error.
        #[source]
        source: Arc<reqwest::Error>,
    },
    /// The backend did not answer in time.
    #[error("request to {url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
    },
    /// The response body could not be read.
    #[error("could not read response from {url}: {source}")]
    Body {
        /// Target URL.
        url: String,
        /// Underlying error.
        #[source]
        source: Arc<reqwest::Error>,
    },
    /// The request failed for another reason.
    #[error("request to {url} failed: {source}")]
    Request {
        /// Target URL.
        url: String,
        /// Underlying error.
        #[source]
        source: Arc<reqwest::Error>,
    },
    /// The call was abandoned through `cancel_active_requests`.
    #[error("request to {url} was cancelled")]
    Cancelled {
        /// Target URL.
        url: String,
    },
}

impl TransportError {
    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        let url = url.to_owned();
        if error.is_timeout() {
            Self::Timeout { url }
        } else if error.is_connect() {
            Self::Connect {
                url,
                source: Arc::new(error),
            }
        } else if error.is_body() || error.is_decode() {
            Self::Body {
                url,
                source: Arc::new(error),
            }
        } else {
            Self::Request {
                url,
                source: Arc::new(error),
            }
        }
    }
}

/// Sends downstream requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs `request` and returns the status and body text.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Transport whose calls fail after `timeout`.
    ///
    /// # Errors
    ///
    /// [`TransportError::Client`] when the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| TransportError::Client(Arc::new(error)))?;
        Ok(Self { client })
    }

    /// Transport using the configured proxy timeout.
    ///
    /// # Errors
    ///
    /// See [`ReqwestTransport::new`].
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(config.proxy_timeout())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .client
            .request(method, &request.url)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, "application/json, */*");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|error| TransportError::from_reqwest(&request.url, error))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| TransportError::from_reqwest(&request.url, error))?;
        Ok(TransportResponse { status, body })
    }
}
