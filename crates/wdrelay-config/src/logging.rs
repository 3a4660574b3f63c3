//! Log output options for the relay.
//!
//! Each part of the relay logs under its own `tracing` target. [`LogArea`]
//! names those targets so filters can be composed without spelling them out.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output format of the installed subscriber.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Flattened JSON events for log shippers.
    #[default]
    Json,
    /// One line per event for terminals.
    Compact,
}

/// Error returned when a [`LogFormat`] name is not recognised.
pub type LogFormatParseError = strum::ParseError;

/// A part of the relay with its own log target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LogArea {
    /// Inbound routing, validation and rendering.
    Dispatch,
    /// Calls forwarded to the downstream backend.
    Proxy,
    /// Dialect detection for sessions and backends.
    Dialect,
    /// Capability matching at session creation.
    Capabilities,
}

impl LogArea {
    /// Every area, in pipeline order.
    pub const ALL: [Self; 4] = [Self::Dispatch, Self::Proxy, Self::Dialect, Self::Capabilities];

    /// `tracing` target the area logs under.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Dispatch => "wdrelayd::dispatch",
            Self::Proxy => "wdrelay-proxy::proxy",
            Self::Dialect => "wdrelay-protocol::dialect",
            Self::Capabilities => "wdrelay-protocol::caps",
        }
    }

    /// Whether the area writes request and response bodies at `debug`.
    #[must_use]
    pub const fn carries_traffic(self) -> bool {
        matches!(self, Self::Dispatch | Self::Proxy)
    }
}

/// Filter directives raising every traffic area to `debug`.
pub fn traffic_directives() -> impl Iterator<Item = String> {
    LogArea::ALL
        .into_iter()
        .filter(|area| area.carries_traffic())
        .map(|area| format!("{}=debug", area.target()))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::upper("JSON", Some(LogFormat::Json))]
    #[case::lower("compact", Some(LogFormat::Compact))]
    #[case::unknown("pretty", None)]
    fn parses_format_names(#[case] name: &str, #[case] expected: Option<LogFormat>) {
        assert_eq!(LogFormat::from_str(name).ok(), expected);
    }

    #[test]
    fn traffic_directives_cover_dispatch_and_proxy() {
        let directives: Vec<String> = traffic_directives().collect();
        assert_eq!(
            directives,
            ["wdrelayd::dispatch=debug", "wdrelay-proxy::proxy=debug"]
        );
    }
}
