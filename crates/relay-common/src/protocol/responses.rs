use serde::{Deserialize, Serialize};
use super::RequestId;

/// RPC method result (JSON value)
pub type RpcResult = serde_json::Value;

/// A reply as it travels on the wire.
///
/// `success == false` means the remote endpoint processed the request and
/// answered with an application error; the transport surfaces that as an
/// application failure, which never fails over.
///
/// # Example
///
/// ```
/// use relay_common::protocol::Response;
/// use serde_json::json;
///
/// let ok = Response::success(123, json!({"pi": 3.14159}));
/// assert!(ok.success);
///
/// let rejected = Response::error(123, "Division by zero");
/// assert_eq!(rejected.error.as_deref(), Some("Division by zero"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub id: RequestId,
    pub result: Option<RpcResult>,
    pub error: Option<String>,
    pub success: bool,
}

impl Response {
    pub fn success(id: RequestId, result: RpcResult) -> Self {
        Response {
            id,
            result: Some(result),
            error: None,
            success: true,
        }
    }

    pub fn error(id: RequestId, error: impl Into<String>) -> Self {
        Response {
            id,
            result: None,
            error: Some(error.into()),
            success: false,
        }
    }
}
