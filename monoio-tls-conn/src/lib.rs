//! Secured connections for monoio.
//!
//! This crate dials or accepts a TCP peer, runs the rustls handshake and
//! hands back a [`TlsConnection`]: a pair of monoio stream handles bound to
//! one TLS session, plus the peer address and an infallible close action.
//!
//! Two layers are exposed. [`TlsConnector::connect_secure`] and
//! [`TlsAcceptor::accept_secure`] produce a ready-to-use [`TlsConnection`]
//! whose read side reports every transport or protocol failure as a plain
//! end-of-stream. [`TlsConnector::connect_session`] and the raw
//! [`Stream`] keep the underlying errors visible for callers that want to
//! drive the session themselves.

mod client;
mod conn;
mod error;
mod io_wrapper;
mod server;
mod session;
mod split;
mod stream;

pub use client::{TlsConnector, TlsStream as ClientTlsStream};
pub use conn::TlsConnection;
pub use error::TlsError;
pub use server::{TlsAcceptor, TlsStream as ServerTlsStream};
pub use session::Session;
pub use split::{ReadHalf, ReuniteError, WriteHalf};
pub use stream::Stream;
