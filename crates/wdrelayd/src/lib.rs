//! WebDriver command dispatch over a pluggable driver.
//!
//! [`Dispatcher`] accepts requests in either the legacy JSON Wire Protocol or
//! the W3C dialect, routes and validates them, and calls a [`Driver`] to do
//! the work. Results are wrapped in the envelope of the session's dialect,
//! which the dispatcher learns at session creation and keeps in its
//! [`SessionRegistry`]. A driver may instead hand whole sessions to a
//! downstream backend, usually through a `wdrelay_proxy::ProxyClient`.
//!
//! Transports stay outside this crate: they build an [`InboundRequest`] and
//! write back the [`WireResponse`]. Processes embedding the dispatcher call
//! [`telemetry::initialise`] once to install structured logging.

pub mod dispatch;
pub mod driver;
pub mod sessions;
pub mod telemetry;

pub use dispatch::{Dispatcher, InboundRequest, RequestError, WireResponse};
pub use driver::{AvoidList, AvoidRule, CommandOutcome, Driver, DriverFeatures};
pub use sessions::{SessionRecord, SessionRegistry};
pub use telemetry::{TelemetryError, TelemetryHandle};
