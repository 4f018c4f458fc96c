#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Request dispatch and transport bindings for the Sokobots engine.
//!
//! A [`Dispatcher`] owns the live world and turns JSON request payloads into
//! JSON response payloads. Transports only move payloads: [`LengthPrefixed`]
//! frames them for stream sockets and [`LineDelimited`] for pipes, and
//! [`serve_session`] drives either one against a handler. Both bindings
//! therefore produce identical payloads for identical request sequences.

mod dispatcher;
mod error;
mod framing;
mod request;
mod response;
mod session;

pub use dispatcher::{Dispatcher, DispatcherSettings, SharedDispatcher};
pub use error::{DispatchError, TransportError};
pub use framing::{LengthPrefixed, LineDelimited, Transport, DEFAULT_MAX_FRAME_LEN};
pub use request::Request;
pub use response::{Response, StatePayload};
pub use session::serve_session;
