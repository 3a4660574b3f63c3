use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Location of the downstream WebDriver backend.
///
/// Serialised as a URL string such as `http://127.0.0.1:8100/wd/hub`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct DownstreamEndpoint {
    scheme: String,
    host: String,
    port: u16,
    base: String,
}

impl DownstreamEndpoint {
    /// Builds an endpoint from its parts.
    ///
    /// The scheme is lower-cased and a trailing slash on `base` is dropped.
    #[must_use]
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        base: impl Into<String>,
    ) -> Self {
        let base = base.into();
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            host: host.into(),
            port,
            base: base.trim_end_matches('/').to_owned(),
        }
    }

    /// URL scheme, `http` or `https`.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Base path without a trailing slash; may be empty.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// `scheme://host:port/base`, the prefix every proxied URL starts with.
    #[must_use]
    pub fn origin_with_base(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.base)
    }
}

impl fmt::Display for DownstreamEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.origin_with_base())
    }
}

impl FromStr for DownstreamEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(EndpointParseError::UnsupportedScheme(scheme.to_owned()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
        Ok(Self::new(scheme, host, port, url.path()))
    }
}

impl TryFrom<String> for DownstreamEndpoint {
    type Error = EndpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DownstreamEndpoint> for String {
    fn from(endpoint: DownstreamEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors encountered while parsing a [`DownstreamEndpoint`].
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Only `http` and `https` backends can be proxied to.
    #[error("unsupported downstream scheme '{0}'")]
    UnsupportedScheme(String),
    /// The URL had no host component.
    #[error("missing downstream host in '{0}'")]
    MissingHost(String),
    /// The URL had no port and the scheme has no default.
    #[error("missing downstream port in '{0}'")]
    MissingPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_host_port_and_base() {
        let endpoint: DownstreamEndpoint = "http://127.0.0.1:8100/wd/hub/"
            .parse()
            .expect("endpoint should parse");
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 8100);
        assert_eq!(endpoint.base(), "/wd/hub");
        assert_eq!(endpoint.to_string(), "http://127.0.0.1:8100/wd/hub");
    }

    #[test]
    fn root_path_yields_empty_base() {
        let endpoint: DownstreamEndpoint = "https://grid.local".parse().expect("parse");
        assert_eq!(endpoint.port(), 443);
        assert_eq!(endpoint.base(), "");
        assert_eq!(endpoint.origin_with_base(), "https://grid.local:443");
    }

    #[rstest]
    #[case::ftp("ftp://host:21/")]
    #[case::unix("unix:///tmp/driver.sock")]
    fn rejects_non_http_schemes(#[case] input: &str) {
        let error = input.parse::<DownstreamEndpoint>().expect_err("should reject");
        assert!(matches!(error, EndpointParseError::UnsupportedScheme(_)));
    }

    #[test]
    fn rejects_garbage() {
        let error = "not a url".parse::<DownstreamEndpoint>().expect_err("reject");
        assert!(matches!(error, EndpointParseError::Url(_)));
    }
}
