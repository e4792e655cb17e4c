use std::fmt;
use std::time::Duration;

use crate::checksum::checksum;
use crate::error::{DescriptorError, Result};

/// Default connect timeout (5 seconds)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default socket (per-attempt I/O) timeout (30 seconds)
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-target timeout budgets.
///
/// - `connect`: time allowed to establish a connection
/// - `socket`: time allowed for the request/response exchange once connected
/// - `total`: optional ceiling for a whole attempt against this target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetTimeouts {
    pub connect: Duration,
    pub socket: Duration,
    pub total: Option<Duration>,
}

impl Default for TargetTimeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            socket: DEFAULT_SOCKET_TIMEOUT,
            total: None,
        }
    }
}

impl TargetTimeouts {
    /// Builds timeouts from millisecond values as they appear in configuration.
    ///
    /// Missing values fall back to the defaults. Negative values are rejected.
    pub fn from_millis(
        connect_ms: Option<i64>,
        socket_ms: Option<i64>,
        total_ms: Option<i64>,
    ) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            connect: millis("connect_timeout_ms", connect_ms)?.unwrap_or(defaults.connect),
            socket: millis("socket_timeout_ms", socket_ms)?.unwrap_or(defaults.socket),
            total: millis("total_timeout_ms", total_ms)?,
        })
    }
}

fn millis(field: &'static str, value: Option<i64>) -> Result<Option<Duration>> {
    match value {
        None => Ok(None),
        Some(v) if v < 0 => Err(DescriptorError::NegativeTimeout { field, value: v }),
        Some(v) => Ok(Some(Duration::from_millis(v as u64))),
    }
}

/// One concrete, directly callable endpoint.
///
/// The checksum is derived from the address string alone, so two targets
/// with the same address always share a checksum.
///
/// # Example
///
/// ```
/// use relay_descriptor::Target;
///
/// let target = Target::new("tcp://10.0.0.5:9001").unwrap();
/// assert_eq!(target.host(), "10.0.0.5");
/// assert_eq!(target.port(), 9001);
/// assert_eq!(target.authority(), "10.0.0.5:9001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    address: String,
    checksum: u32,
    scheme: Option<String>,
    host: String,
    port: u16,
    timeouts: TargetTimeouts,
}

impl Target {
    /// Creates a target with default timeouts.
    ///
    /// Accepted forms are `host:port`, `[ipv6]:port` and
    /// `scheme://host[:port][/path]`. The port may only be omitted for the
    /// `http` (80) and `https` (443) schemes.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        let parsed = parse_address(&address)?;
        Ok(Self {
            checksum: checksum(&address),
            scheme: parsed.scheme,
            host: parsed.host,
            port: parsed.port,
            address,
            timeouts: TargetTimeouts::default(),
        })
    }

    pub fn with_timeouts(mut self, timeouts: TargetTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, with IPv6 hosts re-bracketed, suitable for socket resolution.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn timeouts(&self) -> &TargetTimeouts {
        &self.timeouts
    }

    pub fn connect_timeout(&self) -> Duration {
        self.timeouts.connect
    }

    pub fn socket_timeout(&self) -> Duration {
        self.timeouts.socket
    }

    pub fn total_timeout(&self) -> Option<Duration> {
        self.timeouts.total
    }

    /// Upper bound for a single attempt against this target.
    ///
    /// `connect + socket`, capped by the target's total timeout when set.
    pub fn attempt_budget(&self) -> Duration {
        let io = self.timeouts.connect.saturating_add(self.timeouts.socket);
        match self.timeouts.total {
            Some(total) => io.min(total),
            None => io,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{:08x}]", self.address, self.checksum)
    }
}

struct ParsedAddress {
    scheme: Option<String>,
    host: String,
    port: u16,
}

fn parse_address(address: &str) -> Result<ParsedAddress> {
    if address.trim().is_empty() {
        return Err(DescriptorError::invalid_address(address, "address is empty"));
    }
    if address.chars().any(char::is_whitespace) {
        return Err(DescriptorError::invalid_address(address, "address contains whitespace"));
    }

    let (scheme, rest) = match address.split_once("://") {
        Some((scheme, rest)) => {
            let valid = !scheme.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if !valid {
                return Err(DescriptorError::invalid_address(
                    address,
                    format!("invalid scheme '{}'", scheme),
                ));
            }
            (Some(scheme.to_ascii_lowercase()), rest)
        }
        None => (None, address),
    };

    // Drop any path component
    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(DescriptorError::invalid_address(address, "missing host"));
    }

    let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after) = bracketed.split_once(']').ok_or_else(|| {
            DescriptorError::invalid_address(address, "unterminated '[' in IPv6 host")
        })?;
        let port = match after {
            "" => None,
            p => Some(p.strip_prefix(':').ok_or_else(|| {
                DescriptorError::invalid_address(address, "expected ':' after IPv6 host")
            })?),
        };
        (host, port)
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(DescriptorError::invalid_address(address, "missing host"));
    }
    if host.contains(['[', ']', '@']) {
        return Err(DescriptorError::invalid_address(
            address,
            format!("invalid host '{}'", host),
        ));
    }

    let port = match port {
        Some(p) => {
            let port: u16 = p.parse().map_err(|_| {
                DescriptorError::invalid_address(address, format!("invalid port '{}'", p))
            })?;
            if port == 0 {
                return Err(DescriptorError::invalid_address(address, "port must not be 0"));
            }
            port
        }
        None => match scheme.as_deref() {
            Some("http") => 80,
            Some("https") => 443,
            _ => return Err(DescriptorError::invalid_address(address, "missing port")),
        },
    };

    Ok(ParsedAddress {
        scheme,
        host: host.to_string(),
        port,
    })
}
