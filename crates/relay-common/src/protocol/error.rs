//! Call failure taxonomy.
//!
//! Every failure of a call attempt is classified into exactly one
//! [`CallErrorKind`]. The kind alone decides whether the caller may fail over
//! to another target ([`FailOverPolicy`]), so transports must never hand the
//! caller an unclassified error.
//!
//! ```text
//! FailureCategory
//! ├── Resolution      UnknownHost                          always fails over
//! ├── Connection      NoRouteToHost, ConnectionRefused,
//! │                   ConnectTimeout, ConnectFailed        always fails over
//! ├── MidCallIo       SocketTimeout, ConnectionDropped,
//! │                   InvalidResponse, Unclassified        only if idempotent
//! ├── Application     Application                          never
//! ├── Exhaustion      NoMoreTargets                        never (terminal)
//! └── BudgetExceeded  TotalTimeoutExceeded                 never (terminal)
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use relay_descriptor::Target;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Request;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Coarse failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// The target address could not be resolved
    Resolution,
    /// No connection was established; no request bytes were exchanged
    Connection,
    /// The connection failed after the request may have been sent
    MidCallIo,
    /// The remote endpoint answered with a structured error
    Application,
    /// No candidate targets are left
    Exhaustion,
    /// The total time budget of the logical call elapsed
    BudgetExceeded,
}

/// Whether a failed attempt may be retried on another target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOverPolicy {
    Always,
    IfIdempotent,
    Never,
}

/// Classified failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallErrorKind {
    UnknownHost,
    NoRouteToHost,
    ConnectionRefused,
    ConnectTimeout,
    ConnectFailed,
    SocketTimeout,
    ConnectionDropped,
    InvalidResponse,
    Unclassified,
    Application,
    NoMoreTargets,
    TotalTimeoutExceeded,
}

impl CallErrorKind {
    pub fn category(self) -> FailureCategory {
        use CallErrorKind::*;
        match self {
            UnknownHost => FailureCategory::Resolution,
            NoRouteToHost | ConnectionRefused | ConnectTimeout | ConnectFailed => {
                FailureCategory::Connection
            }
            SocketTimeout | ConnectionDropped | InvalidResponse | Unclassified => {
                FailureCategory::MidCallIo
            }
            Application => FailureCategory::Application,
            NoMoreTargets => FailureCategory::Exhaustion,
            TotalTimeoutExceeded => FailureCategory::BudgetExceeded,
        }
    }

    pub fn fail_over_policy(self) -> FailOverPolicy {
        match self.category() {
            FailureCategory::Resolution | FailureCategory::Connection => FailOverPolicy::Always,
            FailureCategory::MidCallIo => FailOverPolicy::IfIdempotent,
            FailureCategory::Application
            | FailureCategory::Exhaustion
            | FailureCategory::BudgetExceeded => FailOverPolicy::Never,
        }
    }

    /// Fixed human-readable reason for this kind.
    pub fn short_reason(self) -> &'static str {
        use CallErrorKind::*;
        match self {
            UnknownHost => "Unknown host",
            NoRouteToHost => "No route to host",
            ConnectionRefused => "Connection refused",
            ConnectTimeout => "Connect timeout",
            ConnectFailed => "Connection failed",
            SocketTimeout => "Socket timeout",
            ConnectionDropped => "Connection dropped",
            InvalidResponse => "Invalid response",
            Unclassified => "Unexpected failure",
            Application => "Unsuccessful result",
            NoMoreTargets => "No more targets",
            TotalTimeoutExceeded => "Total timeout exceeded",
        }
    }

    /// True for kinds the engine produces itself rather than a transport.
    pub fn is_terminal(self) -> bool {
        matches!(
            self.category(),
            FailureCategory::Exhaustion | FailureCategory::BudgetExceeded
        )
    }
}

impl fmt::Display for CallErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_reason())
    }
}

/// Rejected attempt to construct a [`CallError`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidCallError {
    #[error("Call duration must not be negative: {0}ms")]
    NegativeDuration(i64),
}

/// A classified call failure.
///
/// Carries the request, the target attempted and how long the attempt (or,
/// for terminal kinds, the whole logical call) took. Terminal kinds keep the
/// last attempt's error as [`last_attempt`](Self::last_attempt), which is also
/// returned by [`std::error::Error::source`].
#[derive(Debug)]
pub struct CallError {
    kind: CallErrorKind,
    request: Arc<Request>,
    target: Target,
    duration: Duration,
    detail: Option<String>,
    last_attempt: Option<Box<CallError>>,
    source: Option<BoxError>,
}

impl CallError {
    pub fn new(kind: CallErrorKind, request: Arc<Request>, target: Target, duration: Duration) -> Self {
        Self {
            kind,
            request,
            target,
            duration,
            detail: None,
            last_attempt: None,
            source: None,
        }
    }

    /// Builds an error from a signed millisecond duration, as reported by
    /// external diagnostics. Negative durations are rejected.
    pub fn from_millis(
        kind: CallErrorKind,
        request: Arc<Request>,
        target: Target,
        duration_ms: i64,
    ) -> std::result::Result<Self, InvalidCallError> {
        if duration_ms < 0 {
            return Err(InvalidCallError::NegativeDuration(duration_ms));
        }
        Ok(Self::new(kind, request, target, Duration::from_millis(duration_ms as u64)))
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_last_attempt(mut self, last_attempt: CallError) -> Self {
        self.last_attempt = Some(Box::new(last_attempt));
        self
    }

    pub fn kind(&self) -> CallErrorKind {
        self.kind
    }

    pub fn category(&self) -> FailureCategory {
        self.kind.category()
    }

    pub fn short_reason(&self) -> &'static str {
        self.kind.short_reason()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// The failure of the final attempt, for terminal kinds.
    pub fn last_attempt(&self) -> Option<&CallError> {
        self.last_attempt.as_deref()
    }

    /// Whether the caller may retry this request on a different target.
    pub fn is_fail_over_allowed(&self) -> bool {
        match self.kind.fail_over_policy() {
            FailOverPolicy::Always => true,
            FailOverPolicy::IfIdempotent => self.request.idempotent,
            FailOverPolicy::Never => false,
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} calling '{}' on {} after {}ms",
            self.kind.short_reason(),
            self.request.method,
            self.target,
            self.duration.as_millis()
        )?;
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl StdError for CallError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        if let Some(last) = &self.last_attempt {
            return Some(last.as_ref());
        }
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Failure reported by a transport.
///
/// The transport only knows what went wrong; the caller attaches the
/// request, the target and the measured duration to produce a [`CallError`].
#[derive(Debug)]
pub struct TransportError {
    kind: CallErrorKind,
    detail: Option<String>,
    source: Option<BoxError>,
}

impl TransportError {
    pub fn new(kind: CallErrorKind) -> Self {
        Self {
            kind,
            detail: None,
            source: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The remote endpoint answered with an error.
    pub fn application(message: impl Into<String>) -> Self {
        Self::new(CallErrorKind::Application).with_detail(message)
    }

    /// Wraps an error the transport could not classify.
    pub fn unclassified(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::new(CallErrorKind::Unclassified)
            .with_detail(source.to_string())
            .with_source(source)
    }

    pub fn kind(&self) -> CallErrorKind {
        self.kind
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Attaches call context, producing the error the caller reasons about.
    pub fn into_call_error(
        self,
        request: Arc<Request>,
        target: Target,
        duration: Duration,
    ) -> CallError {
        let mut error = CallError::new(self.kind, request, target, duration);
        error.detail = self.detail;
        error.source = self.source;
        error
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.kind.short_reason(), detail),
            None => f.write_str(self.kind.short_reason()),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for TransportError {
    /// I/O errors without further context are treated as mid-call failures.
    fn from(err: std::io::Error) -> Self {
        let kind = crate::transport::classify_call_error(&err);
        TransportError::new(kind)
            .with_detail(err.to_string())
            .with_source(err)
    }
}

pub type Result<T> = std::result::Result<T, CallError>;
