use crate::endpoint::DownstreamEndpoint;
use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Path prefix used by legacy WebDriver servers and most clients.
pub const DEFAULT_BASE_PATH: &str = "/wd/hub";

/// Downstream calls give up after four minutes.
pub const DEFAULT_PROXY_TIMEOUT_MS: u64 = 240_000;

const DEFAULT_DOWNSTREAM_SCHEME: &str = "http";
const DEFAULT_DOWNSTREAM_HOST: &str = "localhost";
const DEFAULT_DOWNSTREAM_PORT: u16 = 4444;

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value, for the configuration loader.
pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default route prefix.
#[must_use]
pub const fn default_base_path() -> &'static str {
    DEFAULT_BASE_PATH
}

pub(crate) fn default_base_path_string() -> String {
    DEFAULT_BASE_PATH.to_owned()
}

/// Downstream endpoint used when nothing else is configured.
#[must_use]
pub fn default_downstream_endpoint() -> DownstreamEndpoint {
    DownstreamEndpoint::new(
        DEFAULT_DOWNSTREAM_SCHEME,
        DEFAULT_DOWNSTREAM_HOST,
        DEFAULT_DOWNSTREAM_PORT,
        DEFAULT_BASE_PATH,
    )
}
