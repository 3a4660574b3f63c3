//! Forwarding of WebDriver commands to a downstream backend.
//!
//! [`ProxyClient`] owns the downstream session: it rewrites inbound URLs onto
//! the backend, tracks which dialect the backend speaks, converts payloads
//! through [`ProtocolConverter`] when the client and backend disagree, and
//! decodes whatever comes back. The network itself sits behind
//! [`HttpTransport`] so the client can be driven without sockets.

mod client;
pub mod converter;
mod transport;

pub use client::{ActiveRequests, ProxyClient, ProxyResponse};
pub use converter::{ConversionPlan, DownstreamCall, ProtocolConverter};
pub use transport::{
    HttpTransport, ReqwestTransport, TransportError, TransportRequest, TransportResponse,
};

/// Tracing target for downstream traffic.
pub(crate) const PROXY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::proxy");

#[cfg(test)]
mod tests;
