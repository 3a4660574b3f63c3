//! Request dispatch for WebDriver endpoints.
//!
//! A transport hands each request to [`Dispatcher::dispatch`] as an
//! [`InboundRequest`] and writes back the [`WireResponse`] it returns. In
//! between, the dispatcher strips the base path and looks the route up. It
//! then either hands the request to the driver's downstream proxy or
//! validates it, calls the driver and wraps the result in the session's
//! dialect. Failures at any stage come back as error envelopes; nothing is
//! retried.

mod errors;
mod handler;
mod request;
mod response;
mod router;

pub use errors::RequestError;
pub use handler::Dispatcher;
pub use request::InboundRequest;
pub use response::WireResponse;
