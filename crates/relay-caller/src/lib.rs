//! Relay Service Caller
//!
//! The failover engine of relay. A [`ServiceCaller`] takes a logical request
//! and a [`Descriptor`](relay_descriptor::Descriptor) tree of candidate
//! targets, and tries them one after another through a
//! [`Transport`](relay_common::Transport) until one answers.
//!
//! # Failover Rules
//!
//! Whether a failed attempt moves on to the next target depends only on the
//! failure's [`CallErrorKind`](relay_common::CallErrorKind):
//!
//! - Resolution and connection failures: always, nothing reached the target
//! - Mid-call I/O failures: only for requests marked idempotent
//! - Application failures: never, the target answered
//!
//! A call that runs out of candidates fails with `NoMoreTargets`; one that
//! runs out of time fails with `TotalTimeoutExceeded`. Both keep the last
//! attempt's error as their cause.
//!
//! # Example
//!
//! ```no_run
//! use relay_caller::{RelayConfig, ServiceCaller};
//! use relay_common::{Request, TcpTransport};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelayConfig::from_path("relay.toml")?;
//! let caller = ServiceCaller::from_config(&config, Arc::new(TcpTransport::new()))?;
//!
//! let request = Request::new("compute", json!({"n": 10})).idempotent(true);
//! match caller.call(request).await {
//!     Ok(success) => println!("{} answered {}", success.target, success.payload),
//!     Err(failure) => eprintln!("call failed: {}", failure),
//! }
//! # Ok(())
//! # }
//! ```

pub mod caller;
pub mod config;

pub use caller::{CallFailure, CallSuccess, ServiceCaller};
pub use config::{CallerConfig, ConfigError, RelayConfig, RetryConfig};
