//! Shared configuration for the wdrelay protocol core.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then a
//! configuration file, then `WDRELAY_*` environment variables, then command-line
//! flags. The resulting [`Config`] tells the dispatcher which base path to strip
//! from inbound requests and tells proxy clients where the downstream backend
//! lives and how long a single downstream call may take.

mod defaults;
mod endpoint;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BASE_PATH, DEFAULT_LOG_FILTER, DEFAULT_PROXY_TIMEOUT_MS, default_base_path,
    default_downstream_endpoint, default_log_filter, default_log_format,
};
pub use endpoint::{DownstreamEndpoint, EndpointParseError};
pub use logging::{LogArea, LogFormat, LogFormatParseError, traffic_directives};

/// Runtime configuration shared by the dispatcher and the downstream proxy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WDRELAY")]
pub struct Config {
    /// `tracing` filter expression, for example `info` or `wdrelayd=debug`.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Logs inbound and downstream bodies at `debug` whatever `log_filter`
    /// says.
    #[ortho_config(default = false)]
    pub log_traffic: bool,
    /// Path prefix under which the WebDriver routes are mounted.
    #[ortho_config(default = defaults::default_base_path_string())]
    pub base_path: String,
    /// Downstream backend that proxied sessions talk to.
    #[ortho_config(default = defaults::default_downstream_endpoint())]
    pub downstream: DownstreamEndpoint,
    /// Per-call timeout for downstream requests, in milliseconds.
    #[ortho_config(default = defaults::DEFAULT_PROXY_TIMEOUT_MS)]
    pub proxy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
            log_traffic: false,
            base_path: defaults::default_base_path_string(),
            downstream: defaults::default_downstream_endpoint(),
            proxy_timeout_ms: defaults::DEFAULT_PROXY_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Selected log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Whether wire traffic is logged regardless of the filter.
    #[must_use]
    pub const fn log_traffic(&self) -> bool {
        self.log_traffic
    }

    /// Route prefix with any trailing slash removed.
    ///
    /// An empty string means routes are mounted at the root.
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }

    /// Downstream backend endpoint.
    #[must_use]
    pub const fn downstream(&self) -> &DownstreamEndpoint {
        &self.downstream
    }

    /// Downstream call timeout as a [`Duration`].
    #[must_use]
    pub const fn proxy_timeout(&self) -> Duration {
        Duration::from_millis(self.proxy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn default_config_uses_documented_values() {
        let config = Config::default();
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert!(!config.log_traffic());
        assert_eq!(config.base_path(), "/wd/hub");
        assert_eq!(config.proxy_timeout(), Duration::from_secs(240));
        assert_eq!(config.downstream().to_string(), "http://localhost:4444/wd/hub");
    }

    #[rstest]
    #[case::trailing_slash("/wd/hub/", "/wd/hub")]
    #[case::root("/", "")]
    #[case::empty("", "")]
    #[case::custom("/relay", "/relay")]
    fn base_path_drops_trailing_slash(#[case] raw: &str, #[case] expected: &str) {
        let config = Config {
            base_path: raw.to_owned(),
            ..Config::default()
        };
        assert_eq!(config.base_path(), expected);
    }
}
