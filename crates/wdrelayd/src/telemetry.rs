//! Tracing subscriber setup for processes embedding the dispatcher.
//!
//! The filter starts from `log_filter`. With `log_traffic` set, the dispatch
//! and proxy areas are raised to `debug` on top of it so request and response
//! bodies show up without opening the floodgates elsewhere.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, info, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::fmt;
use wdrelay_config::{Config, LogArea, LogFormat, traffic_directives};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Proof that the global subscriber is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A filter directive does not parse.
    #[error("invalid log filter '{directive}': {message}")]
    Filter {
        /// Offending directive or expression.
        directive: String,
        /// Parser message.
        message: String,
    },
    /// Another subscriber already owns the global slot.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

impl TelemetryError {
    fn filter(directive: &str, error: &ParseError) -> Self {
        Self::Filter {
            directive: directive.to_owned(),
            message: error.to_string(),
        }
    }
}

/// Installs the global tracing subscriber described by `config`.
///
/// Only the first call touches global state; later calls return a fresh
/// handle whatever configuration they carry.
///
/// # Examples
///
/// ```rust
/// use wdrelay_config::Config;
/// use wdrelayd::telemetry;
///
/// # fn main() -> Result<(), wdrelayd::telemetry::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// drop((first, second));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// [`TelemetryError::Filter`] for a malformed `log_filter` and
/// [`TelemetryError::Subscriber`] when a foreign subscriber is already set.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn relay_filter(config: &Config) -> Result<EnvFilter, TelemetryError> {
    let mut filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::filter(config.log_filter(), &error))?;
    if config.log_traffic() {
        for raw in traffic_directives() {
            let directive: Directive = raw
                .parse()
                .map_err(|error| TelemetryError::filter(&raw, &error))?;
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = relay_filter(config)?;
    let ansi = config.log_format() == LogFormat::Compact && io::stderr().is_terminal();
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;

    info!(
        target: LogArea::Dispatch.target(),
        format = %config.log_format(),
        filter = config.log_filter(),
        traffic = config.log_traffic(),
        "telemetry installed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn config(filter: &str, traffic: bool) -> Config {
        Config {
            log_filter: filter.to_owned(),
            log_traffic: traffic,
            ..Config::default()
        }
    }

    #[test]
    fn rejects_malformed_filter() {
        let error = relay_filter(&config("wdrelayd=loudest", false))
            .expect_err("filter should not parse");
        assert!(matches!(
            error,
            TelemetryError::Filter { ref directive, .. } if directive == "wdrelayd=loudest"
        ));
    }

    #[rstest]
    #[case::quiet(false, false)]
    #[case::traffic(true, true)]
    fn traffic_raises_wire_areas(#[case] traffic: bool, #[case] raised: bool) {
        let filter = relay_filter(&config("warn", traffic))
            .expect("filter should parse")
            .to_string()
            .to_lowercase();
        for area in LogArea::ALL {
            let directive = format!("{}=debug", area.target());
            assert_eq!(
                filter.contains(&directive),
                raised && area.carries_traffic(),
                "{area} in {filter}"
            );
        }
    }
}
