//! Centralized error types
//!
//! Codec failures are `MalformedDatagram`. Everything else (transport,
//! config, IO) is a `TelemetryError`, which wraps `MalformedDatagram`
//! when a caller escalates a decode failure.
//! Use `Result<T>` as shorthand for `std::result::Result<T, TelemetryError>`.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::record::Field;

// =============================================================================
// Codec errors
// =============================================================================

/// Reasons a datagram payload cannot be decoded
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedDatagram {
    /// Payload is longer than the configured maximum
    Oversized { len: usize, max: usize },
    /// Fewer than six tokens in the payload
    TooFewTokens { found: usize },
    /// More than six tokens, rejected by the strict policy
    TooManyTokens { found: usize },
    /// A token is not a floating-point number
    InvalidNumber { field: Field, token: String },
}

impl std::error::Error for MalformedDatagram {}

impl fmt::Display for MalformedDatagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversized { len, max } => {
                write!(f, "Datagram too long: {} bytes (max {})", len, max)
            }
            Self::TooFewTokens { found } => {
                write!(f, "Expected 6 fields, found {}", found)
            }
            Self::TooManyTokens { found } => {
                write!(f, "Expected 6 fields, found {}", found)
            }
            Self::InvalidNumber { field, token } => {
                write!(f, "Invalid number for {}: {:?}", field, token)
            }
        }
    }
}

// =============================================================================
// Application errors
// =============================================================================

/// All telemetry tool errors
#[derive(Debug)]
pub enum TelemetryError {
    // === Codec ===
    /// Datagram payload could not be decoded
    Malformed(MalformedDatagram),

    // === Transport ===
    /// Failed to bind UDP socket
    UdpBind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    /// Failed to send a datagram
    UdpSend {
        peer: SocketAddr,
        source: std::io::Error,
    },
    /// Failed to receive a datagram
    UdpReceive { source: std::io::Error },
    /// Host/port could not be resolved to a socket address
    AddressResolve { host: String, port: u16 },
    /// No datagram arrived in time
    ReceiveTimeout { after: Duration },
    /// Transport stopped before the operation completed
    TransportClosed,

    // === IO ===
    /// File system operation failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config file could not be read
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config file is not valid TOML for `Config`
    ConfigParse { path: PathBuf, reason: String },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
}

impl TelemetryError {
    /// True for failures of the UDP transport collaborator
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::UdpBind { .. }
                | Self::UdpSend { .. }
                | Self::UdpReceive { .. }
                | Self::AddressResolve { .. }
                | Self::ReceiveTimeout { .. }
                | Self::TransportClosed
        )
    }
}

impl From<MalformedDatagram> for TelemetryError {
    fn from(e: MalformedDatagram) -> Self {
        Self::Malformed(e)
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
            Self::UdpBind { source, .. }
            | Self::UdpSend { source, .. }
            | Self::UdpReceive { source }
            | Self::Io { source, .. }
            | Self::ConfigRead { source, .. }
            | Self::Runtime { source } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "Malformed datagram: {}", e),
            Self::UdpBind { addr, .. } => write!(f, "Cannot bind UDP socket on {}", addr),
            Self::UdpSend { peer, source } => write!(f, "Cannot send to {}: {}", peer, source),
            Self::UdpReceive { source } => write!(f, "UDP receive failed: {}", source),
            Self::AddressResolve { host, port } => {
                write!(f, "Cannot resolve address {}:{}", host, port)
            }
            Self::ReceiveTimeout { after } => {
                write!(f, "No datagram received after {:.1}s", after.as_secs_f64())
            }
            Self::TransportClosed => write!(f, "Transport closed"),
            Self::Io { path, .. } => write!(f, "IO error: {}", path.display()),
            Self::ConfigRead { path, .. } => write!(f, "Cannot read config: {}", path.display()),
            Self::ConfigParse { path, reason } => {
                write!(f, "Invalid config {}: {}", path.display(), reason)
            }
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
        }
    }
}

/// Alias for Result with TelemetryError
pub type Result<T> = std::result::Result<T, TelemetryError>;
