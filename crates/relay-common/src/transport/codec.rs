use crate::protocol::{Request, Response};

/// JSON codec for encoding/decoding RPC messages
///
/// # Example
///
/// ```
/// use relay_common::transport::JsonCodec;
/// use relay_common::protocol::{Request, Response};
/// use serde_json::json;
///
/// let request = Request::new("test", json!({"n": 42}));
/// let encoded = JsonCodec::encode_request(&request).unwrap();
/// assert_eq!(JsonCodec::decode_request(&encoded).unwrap(), request);
///
/// let response = Response::success(request.id, json!({"result": "ok"}));
/// let encoded = JsonCodec::encode_response(&response).unwrap();
/// assert_eq!(JsonCodec::decode_response(&encoded).unwrap(), response);
/// ```
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode_request(request: &Request) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(request)
    }

    pub fn decode_request(data: &[u8]) -> serde_json::Result<Request> {
        serde_json::from_slice(data)
    }

    pub fn encode_response(response: &Response) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(response)
    }

    pub fn decode_response(data: &[u8]) -> serde_json::Result<Response> {
        serde_json::from_slice(data)
    }
}
