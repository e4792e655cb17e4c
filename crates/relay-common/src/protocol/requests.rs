use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

pub type RequestId = u64;
pub type MethodName = String;
pub type RpcArgs = serde_json::Value;

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One logical operation plus its parameters.
///
/// The request is passed unchanged to the transport on every attempt.
/// `idempotent` marks requests that are safe to repeat on another target
/// even after a connection failed mid-call; `timeout_ms` is a caller deadline
/// for the whole logical call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub method: MethodName,
    pub args: RpcArgs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub idempotent: bool,
}

impl Request {
    pub fn new(method: impl Into<String>, args: RpcArgs) -> Self {
        Request {
            id: generate_request_id(),
            method: method.into(),
            args,
            timeout_ms: None,
            idempotent: false,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn generate_request_id() -> RequestId {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let counter = REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst);

    // Upper 32 bits from the clock, lower 32 bits from the counter
    (timestamp & 0xFFFF_FFFF_0000_0000) | (counter & 0xFFFF_FFFF)
}
