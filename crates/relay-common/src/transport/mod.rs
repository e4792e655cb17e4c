//! Relay Transport Boundary
//!
//! The failover engine never talks to the network itself. It hands each
//! attempt to a [`Transport`], which either returns the reply payload or a
//! [`TransportError`] already classified into the call failure taxonomy.
//!
//! # Components
//!
//! - **[`Transport`]**: the capability consumed by the caller
//! - **[`JsonCodec`]**: JSON encoding of [`Request`]/[`Response`]
//! - **[`TcpTransport`]**: reference transport over TCP using the
//!   length-prefixed JSON framing `[4-byte length as u32 big-endian] + [JSON data]`
//! - [`classify_connect_error`] / [`classify_call_error`]: map I/O errors to
//!   taxonomy kinds depending on whether the connection was established
//!
//! [`Request`]: crate::protocol::Request
//! [`Response`]: crate::protocol::Response

pub mod codec;
pub mod tcp;


use std::io;

use async_trait::async_trait;
use relay_descriptor::Target;

use crate::protocol::{CallErrorKind, Request, RpcResult, TransportError};

pub use codec::JsonCodec;
pub use tcp::TcpTransport;

/// Issues one attempt of a request against one target.
///
/// Implementations must classify every failure; there is no way to return
/// an untyped error. Use [`TransportError::unclassified`] for anything that
/// fits no other kind.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn invoke(&self, request: &Request, target: &Target) -> Result<RpcResult, TransportError>;
}

/// Classifies an I/O error raised while establishing a connection.
///
/// Nothing has been sent yet, so every result is a connection-level kind.
pub fn classify_connect_error(err: &io::Error) -> CallErrorKind {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => CallErrorKind::ConnectionRefused,
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
            CallErrorKind::NoRouteToHost
        }
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => CallErrorKind::ConnectTimeout,
        _ => CallErrorKind::ConnectFailed,
    }
}

/// Classifies an I/O error raised after the connection was established.
pub fn classify_call_error(err: &io::Error) -> CallErrorKind {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => CallErrorKind::SocketTimeout,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected
        | io::ErrorKind::UnexpectedEof => CallErrorKind::ConnectionDropped,
        io::ErrorKind::InvalidData => CallErrorKind::InvalidResponse,
        _ => CallErrorKind::Unclassified,
    }
}
