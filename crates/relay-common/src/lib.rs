//! Relay Common Types and Transport Boundary
//!
//! This crate provides the request types, the call failure taxonomy, the
//! per-call diagnostics report and the transport capability shared by the
//! relay components:
//!
//! - **Protocol Layer**: [`Request`]/[`Response`], [`CallError`] and its
//!   [`CallErrorKind`] classification, [`CallReport`] diagnostics
//! - **Transport Layer**: the [`Transport`] trait consumed by the service
//!   caller, plus a reference TCP transport with JSON serialization
//!
//! # Wire Format
//!
//! The reference transport uses `[4-byte length prefix as u32 big-endian] +
//! [JSON data]` with a 100 MB frame limit.
//!
//! # Example
//!
//! ```
//! use relay_common::{CallErrorKind, FailOverPolicy, Request};
//! use serde_json::json;
//!
//! let request = Request::new("compute", json!({"n": 1000}))
//!     .with_timeout(5000)
//!     .idempotent(true);
//!
//! assert_eq!(
//!     CallErrorKind::SocketTimeout.fail_over_policy(),
//!     FailOverPolicy::IfIdempotent
//! );
//! assert!(request.idempotent);
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
pub use transport::{TcpTransport, Transport};
