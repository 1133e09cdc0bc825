//! Transport abstraction for datagram I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: How datagrams flow (UDP)
//! - **Codec**: How payloads are encoded/decoded (handled separately)
//!
//! A transport runs as async tokio tasks and talks to the rest of the
//! program through channels of [`Datagram`]s.

pub mod udp;

pub use udp::UdpTransport;

use bytes::Bytes;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::{Result, TelemetryError};

/// One datagram and the remote end it came from (rx) or goes to (tx)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Bytes,
    pub peer: SocketAddr,
}

impl Datagram {
    pub fn new(payload: impl Into<Bytes>, peer: SocketAddr) -> Self {
        Self {
            payload: payload.into(),
            peer,
        }
    }
}

/// Channels for bidirectional communication with a transport
///
/// The transport owns the socket and communicates via these channels.
/// When the transport stops (shutdown or error), it closes the channels.
pub struct TransportChannels {
    /// Datagrams received from the network, tagged with their source
    ///
    /// Returns `None` when the transport has stopped.
    pub rx: mpsc::Receiver<Datagram>,

    /// Datagrams to send, tagged with their destination
    pub tx: mpsc::Sender<Datagram>,
}

/// Trait for spawnable transports
///
/// A transport handles opening the socket, reading and writing datagrams,
/// and its own task model. It does NOT decode payloads (that's the codec's
/// job) and does not decide what to do with malformed data.
///
/// # Lifecycle
///
/// 1. Create transport with configuration
/// 2. Call `spawn()` inside a tokio runtime to start I/O in background
/// 3. Use returned channels for communication
/// 4. Transport runs until the `shutdown` flag is set or the channels are
///    dropped
pub trait Transport: Send + 'static {
    /// Spawn the transport in background
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be initialized (bind failed).
    fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<TransportChannels>;
}

/// Wait for one datagram
///
/// Blocks the calling task until a datagram arrives, the transport stops, or
/// `timeout` (if any) elapses.
pub async fn recv_one(
    rx: &mut mpsc::Receiver<Datagram>,
    timeout: Option<Duration>,
) -> Result<Datagram> {
    let received = match timeout {
        Some(after) => tokio::time::timeout(after, rx.recv())
            .await
            .map_err(|_| TelemetryError::ReceiveTimeout { after })?,
        None => rx.recv().await,
    };
    received.ok_or(TelemetryError::TransportClosed)
}

/// Resolve `host:port` to the first matching socket address
pub fn resolve_peer(host: &str, port: u16) -> Result<SocketAddr> {
    let unresolved = || TelemetryError::AddressResolve {
        host: host.to_string(),
        port,
    };
    (host, port)
        .to_socket_addrs()
        .map_err(|_| unresolved())?
        .next()
        .ok_or_else(unresolved)
}
