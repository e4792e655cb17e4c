use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use relay_descriptor::Target;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::debug;

use super::codec::JsonCodec;
use super::{classify_call_error, classify_connect_error, Transport};
use crate::protocol::{CallErrorKind, Request, Response, RpcResult, TransportError};

/// Largest frame accepted from a peer (100 MB)
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Reference TCP transport.
///
/// Each attempt opens a fresh connection to the target, sends one request
/// frame and waits for one response frame. Failures are classified by phase:
///
/// 1. Resolving the target's `host:port` fails → `UnknownHost`
/// 2. Connecting fails → connection-level kind (refused, no route, timeout)
/// 3. Anything after the connection exists → mid-call kind
/// 4. A response with `success == false` → `Application`
///
/// # Wire Protocol
///
/// ```text
/// [4-byte length as u32 big-endian] [JSON data]
/// ```
///
/// # Example
///
/// ```no_run
/// use relay_common::transport::{TcpTransport, Transport};
/// use relay_common::protocol::Request;
/// use relay_descriptor::Target;
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = TcpTransport::new();
/// let target = Target::new("127.0.0.1:9001")?;
/// let request = Request::new("compute", json!({"n": 100}));
/// let result = transport.invoke(&request, &target).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }

    /// Resolves and connects to a target within its connect timeout.
    ///
    /// Every resolved address is tried in turn; the connect timeout covers
    /// resolution and all connection attempts together.
    pub async fn connect(&self, target: &Target) -> Result<TcpStream, TransportError> {
        let authority = target.authority();
        let deadline = Instant::now() + target.connect_timeout();

        let addrs: Vec<SocketAddr> = match timeout_at(deadline, tokio::net::lookup_host(&authority)).await {
            Err(_) => {
                return Err(TransportError::new(CallErrorKind::ConnectTimeout)
                    .with_detail(format!("resolving '{}' timed out", authority)));
            }
            Ok(Err(e)) => {
                return Err(TransportError::new(CallErrorKind::UnknownHost)
                    .with_detail(format!("'{}': {}", authority, e))
                    .with_source(e));
            }
            Ok(Ok(addrs)) => addrs.collect(),
        };

        if addrs.is_empty() {
            return Err(TransportError::new(CallErrorKind::UnknownHost)
                .with_detail(format!("'{}' resolved to no addresses", authority)));
        }

        let mut last_err: Option<io::Error> = None;
        for addr in addrs {
            match timeout_at(deadline, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    debug!(endpoint = %target, addr = %addr, "Connected");
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    debug!(endpoint = %target, addr = %addr, error = %e, "Connect failed");
                    last_err = Some(e);
                }
                Err(_) => {
                    return Err(TransportError::new(CallErrorKind::ConnectTimeout).with_detail(
                        format!(
                            "no connection to '{}' within {}ms",
                            authority,
                            target.connect_timeout().as_millis()
                        ),
                    ));
                }
            }
        }

        // At least one address was tried, so last_err is set
        let err = last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotConnected));
        Err(TransportError::new(classify_connect_error(&err))
            .with_detail(format!("failed to connect to '{}': {}", authority, err))
            .with_source(err))
    }

    /// Sends one request and reads one response over an established stream.
    pub async fn exchange(stream: &mut TcpStream, request: &Request) -> Result<Response, TransportError> {
        let encoded = JsonCodec::encode_request(request).map_err(TransportError::unclassified)?;

        Self::send_message(stream, &encoded)
            .await
            .map_err(|e| Self::map_io_error(e, "sending request"))?;

        let data = Self::receive_message(stream)
            .await
            .map_err(|e| Self::map_io_error(e, "reading response"))?;

        JsonCodec::decode_response(&data).map_err(|e| {
            TransportError::new(CallErrorKind::InvalidResponse)
                .with_detail(format!("malformed response: {}", e))
                .with_source(e)
        })
    }

    /// Writes one length-prefixed frame.
    pub async fn send_message(stream: &mut TcpStream, data: &[u8]) -> io::Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "message exceeds u32 length prefix")
        })?;
        stream.write_all(&len.to_be_bytes()).await?;
        stream.write_all(data).await?;
        stream.flush().await
    }

    /// Reads one length-prefixed frame, rejecting frames over [`MAX_MESSAGE_SIZE`].
    pub async fn receive_message(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await?;

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_MESSAGE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("message too large: {} bytes (max {} bytes)", len, MAX_MESSAGE_SIZE),
            ));
        }

        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await?;
        Ok(buf)
    }

    fn map_io_error(err: io::Error, context: &str) -> TransportError {
        TransportError::new(classify_call_error(&err))
            .with_detail(format!("{}: {}", context, err))
            .with_source(err)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn invoke(&self, request: &Request, target: &Target) -> Result<RpcResult, TransportError> {
        let mut stream = self.connect(target).await?;

        let response = timeout(target.socket_timeout(), Self::exchange(&mut stream, request))
            .await
            .map_err(|_| {
                TransportError::new(CallErrorKind::SocketTimeout).with_detail(format!(
                    "no response within {}ms",
                    target.socket_timeout().as_millis()
                ))
            })??;

        if response.id != request.id {
            return Err(TransportError::new(CallErrorKind::InvalidResponse).with_detail(format!(
                "response id {} does not match request id {}",
                response.id, request.id
            )));
        }

        if response.success {
            response.result.ok_or_else(|| {
                TransportError::new(CallErrorKind::InvalidResponse)
                    .with_detail("missing result in success response")
            })
        } else {
            Err(TransportError::application(
                response.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}
