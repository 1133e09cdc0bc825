//! UDP transport for telemetry datagrams
//!
//! Binds one socket and uses it both ways:
//! - RX task: receives datagrams, drops oversized ones, sends to channel
//! - TX task: receives from channel, sends each datagram to its peer
//!
//! Senders bind port 0 and only use the TX side; receivers bind the
//! telemetry port and only use the RX side.

use super::{Datagram, Transport, TransportChannels};
use crate::constants::{
    CHANNEL_CAPACITY, MAX_SOCKET_RETRY_ATTEMPTS, RETRY_BASE_DELAY_MS, SHUTDOWN_POLL_MS,
};
use crate::error::{Result, TelemetryError};
use crate::stats::Stats;
use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// UDP transport
///
/// # Example
///
/// ```ignore
/// let transport = UdpTransport::new("0.0.0.0:49003".parse()?, 4096, stats);
/// let mut channels = transport.spawn(shutdown)?;
///
/// while let Some(datagram) = channels.rx.recv().await {
///     println!("{} bytes from {}", datagram.payload.len(), datagram.peer);
/// }
/// ```
pub struct UdpTransport {
    bind_addr: SocketAddr,
    max_datagram_len: usize,
    stats: Arc<Stats>,
}

impl UdpTransport {
    /// Create a new UDP transport bound to `bind_addr`
    ///
    /// Datagrams longer than `max_datagram_len` are dropped on receive.
    pub fn new(bind_addr: SocketAddr, max_datagram_len: usize, stats: Arc<Stats>) -> Self {
        Self {
            bind_addr,
            max_datagram_len,
            stats,
        }
    }

    /// Address the transport will bind to
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

impl Transport for UdpTransport {
    fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<TransportChannels> {
        let (in_tx, in_rx) = mpsc::channel::<Datagram>(CHANNEL_CAPACITY);
        let (out_tx, mut out_rx) = mpsc::channel::<Datagram>(CHANNEL_CAPACITY);

        let socket = create_reusable_udp_socket(self.bind_addr)?;
        debug!("UDP socket bound on {}", self.bind_addr);

        // RX task
        let socket_rx = socket.clone();
        let shutdown_rx = shutdown.clone();
        let stats_rx = self.stats.clone();
        let max_len = self.max_datagram_len;
        tokio::spawn(async move {
            // One extra byte tells a datagram at the limit from a longer one
            let mut buf = vec![0u8; max_len + 1];

            while !shutdown_rx.load(Ordering::Relaxed) {
                match tokio::time::timeout(
                    Duration::from_millis(SHUTDOWN_POLL_MS),
                    socket_rx.recv_from(&mut buf),
                )
                .await
                {
                    Ok(Ok((len, peer))) => {
                        if len > max_len {
                            stats_rx.add_oversized();
                            warn!("Dropped datagram from {}: longer than {} bytes", peer, max_len);
                            continue;
                        }
                        stats_rx.add_received();
                        let datagram = Datagram {
                            payload: Bytes::copy_from_slice(&buf[..len]),
                            peer,
                        };
                        if in_tx.send(datagram).await.is_err() {
                            // Channel closed
                            break;
                        }
                    }
                    Ok(Err(e)) if is_message_too_long(&e) => {
                        stats_rx.add_oversized();
                        warn!("Dropped datagram: longer than {} bytes", max_len);
                    }
                    Ok(Err(e)) => {
                        // Socket recv error (e.g. ICMP port unreachable) - keep polling
                        debug!("{}", TelemetryError::UdpReceive { source: e });
                    }
                    Err(_) => {
                        // Timeout - expected, allows checking shutdown flag
                    }
                }
            }
        });

        // TX task
        let socket_tx = socket;
        let shutdown_tx = shutdown;
        let stats_tx = self.stats;
        tokio::spawn(async move {
            while !shutdown_tx.load(Ordering::Relaxed) {
                match tokio::time::timeout(Duration::from_millis(SHUTDOWN_POLL_MS), out_rx.recv())
                    .await
                {
                    Ok(Some(datagram)) => {
                        match socket_tx.send_to(&datagram.payload, datagram.peer).await {
                            Ok(_) => stats_tx.add_sent(),
                            Err(e) => {
                                stats_tx.add_send_failed();
                                warn!(
                                    "{}",
                                    TelemetryError::UdpSend {
                                        peer: datagram.peer,
                                        source: e,
                                    }
                                );
                            }
                        }
                    }
                    Ok(None) => {
                        // Channel closed
                        break;
                    }
                    Err(_) => {
                        // Timeout - check shutdown flag
                    }
                }
            }
        });

        Ok(TransportChannels {
            rx: in_rx,
            tx: out_tx,
        })
    }
}

/// Create a UDP socket with SO_REUSEADDR for quick rebind
///
/// Broadcast is enabled so a sender can target a subnet broadcast address.
/// Retries a few times if the port is still in use (e.g., from previous run).
fn create_reusable_udp_socket(addr: SocketAddr) -> Result<Arc<UdpSocket>> {
    let map_err = |e| TelemetryError::UdpBind { addr, source: e };

    for attempt in 0..MAX_SOCKET_RETRY_ATTEMPTS {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
            .map_err(map_err)?;
        socket.set_reuse_address(true).map_err(map_err)?;
        socket.set_broadcast(true).map_err(map_err)?;
        socket.set_nonblocking(true).map_err(map_err)?;

        match socket.bind(&addr.into()) {
            Ok(_) => {
                let std_socket: std::net::UdpSocket = socket.into();
                let tokio_socket = UdpSocket::from_std(std_socket).map_err(map_err)?;
                return Ok(Arc::new(tokio_socket));
            }
            Err(_) if attempt < MAX_SOCKET_RETRY_ATTEMPTS - 1 => {
                // Exponential backoff: 200ms, 400ms, 800ms, 1600ms
                std::thread::sleep(Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << attempt)));
            }
            Err(e) => return Err(map_err(e)),
        }
    }

    Err(TelemetryError::UdpBind {
        addr,
        source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "failed after retries"),
    })
}

/// Winsock error for a datagram larger than the receive buffer
#[cfg(windows)]
const WSAEMSGSIZE: i32 = 10040;

/// Whether a receive failed because the datagram did not fit the buffer
///
/// Windows reports this as `WSAEMSGSIZE` instead of returning a truncated
/// length as Unix does.
fn is_message_too_long(e: &std::io::Error) -> bool {
    #[cfg(windows)]
    {
        e.raw_os_error() == Some(WSAEMSGSIZE)
    }
    #[cfg(not(windows))]
    {
        let _ = e;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_udp_transport_new() {
        let transport = UdpTransport::new(loopback(49003), 4096, Arc::new(Stats::new()));
        assert_eq!(transport.bind_addr(), loopback(49003));
        assert_eq!(transport.max_datagram_len, 4096);
    }

    #[tokio::test]
    async fn test_udp_loopback_roundtrip() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Stats::new());

        // Bind receiver on an ephemeral port, then learn which one we got
        let slot = std::net::UdpSocket::bind(loopback(0)).unwrap();
        let port = slot.local_addr().unwrap().port();
        drop(slot);

        let mut receiver = UdpTransport::new(loopback(port), 4096, stats.clone())
            .spawn(shutdown.clone())
            .unwrap();
        let sender = UdpTransport::new(loopback(0), 4096, stats.clone())
            .spawn(shutdown.clone())
            .unwrap();

        sender
            .tx
            .send(Datagram::new(&b"1 2 3 4 5 6"[..], loopback(port)))
            .await
            .unwrap();

        let datagram = tokio::time::timeout(Duration::from_secs(2), receiver.rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert_eq!(datagram.payload.as_ref(), b"1 2 3 4 5 6");
        assert_eq!(datagram.peer.ip(), loopback(0).ip());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sent, 1);
        assert_eq!(snapshot.received, 1);

        shutdown.store(true, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn test_udp_drops_oversized() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Stats::new());

        let slot = std::net::UdpSocket::bind(loopback(0)).unwrap();
        let port = slot.local_addr().unwrap().port();
        drop(slot);

        let mut receiver = UdpTransport::new(loopback(port), 8, stats.clone())
            .spawn(shutdown.clone())
            .unwrap();

        let raw = std::net::UdpSocket::bind(loopback(0)).unwrap();
        raw.send_to(b"way too long for eight", loopback(port)).unwrap();
        raw.send_to(b"short", loopback(port)).unwrap();

        let datagram = tokio::time::timeout(Duration::from_secs(2), receiver.rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert_eq!(datagram.payload.as_ref(), b"short");
        assert_eq!(stats.snapshot().oversized, 1);

        shutdown.store(true, Ordering::SeqCst);
    }

    #[test]
    fn test_ordinary_receive_errors_are_not_oversize() {
        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert!(!is_message_too_long(&refused));
    }

    #[cfg(windows)]
    #[test]
    fn test_wsaemsgsize_counts_as_oversize() {
        let err = std::io::Error::from_raw_os_error(WSAEMSGSIZE);
        assert!(is_message_too_long(&err));
    }
}
