pub mod error;
pub mod report;
pub mod requests;
pub mod responses;

#[cfg(test)]
mod tests;

pub use error::{
    CallError, CallErrorKind, FailOverPolicy, FailureCategory, InvalidCallError, TransportError,
};
pub use report::{AttemptOutcome, AttemptRecord, CallObserver, CallOutcome, CallReport};
pub use requests::{MethodName, Request, RequestId, RpcArgs};
pub use responses::{Response, RpcResult};
