//! Integration tests for the telemetry pipeline
//!
//! Tests the data flow source -> transport -> listener -> sink, first with a
//! mock transport and then over loopback UDP.

use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use uw_telemetry::codec::{DecodePolicy, TelemetryCodec};
use uw_telemetry::listener::{Listener, ListenerCommand};
use uw_telemetry::record::TelemetryRecord;
use uw_telemetry::sender::{run_sender, SenderConfig};
use uw_telemetry::sink::SharedStateSink;
use uw_telemetry::source::RecordSource;
use uw_telemetry::stats::Stats;
use uw_telemetry::transport::{Datagram, Transport, TransportChannels, UdpTransport};
use uw_telemetry::Result;

// =============================================================================
// Mock Transport
// =============================================================================

/// Mock transport for testing without real I/O
pub struct MockTransport {
    /// Datagrams to deliver (simulates incoming traffic)
    rx_data: Vec<Datagram>,
    /// Captured datagrams sent through the transport
    tx_captured: Arc<tokio::sync::Mutex<Vec<Datagram>>>,
}

impl MockTransport {
    /// Create a new mock transport with predefined incoming datagrams
    pub fn new(rx_data: Vec<Datagram>) -> Self {
        Self {
            rx_data,
            tx_captured: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    /// Create an empty mock transport (no incoming data)
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Get captured transmitted data
    pub fn captured(&self) -> Arc<tokio::sync::Mutex<Vec<Datagram>>> {
        self.tx_captured.clone()
    }
}

impl Transport for MockTransport {
    fn spawn(self, _shutdown: Arc<AtomicBool>) -> Result<TransportChannels> {
        let (tx_to_app, rx_from_mock) = mpsc::channel::<Datagram>(16);
        let (tx_from_app, mut rx_to_capture) = mpsc::channel::<Datagram>(16);

        let tx_captured = self.tx_captured.clone();
        tokio::spawn(async move {
            while let Some(datagram) = rx_to_capture.recv().await {
                tx_captured.lock().await.push(datagram);
            }
        });

        let rx_data = self.rx_data;
        tokio::spawn(async move {
            for datagram in rx_data {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if tx_to_app.send(datagram).await.is_err() {
                    break;
                }
            }
        });

        Ok(TransportChannels {
            rx: rx_from_mock,
            tx: tx_from_app,
        })
    }
}

fn peer() -> SocketAddr {
    "172.25.33.243:49003".parse().unwrap()
}

fn text(payload: &'static str) -> Datagram {
    Datagram::new(Bytes::from_static(payload.as_bytes()), peer())
}

fn free_udp_port() -> u16 {
    let slot = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    slot.local_addr().unwrap().port()
}

// =============================================================================
// Mock transport tests
// =============================================================================

#[tokio::test]
async fn test_mock_transport_captures_sender_output() {
    let mock = MockTransport::empty();
    let captured = mock.captured();
    let shutdown = Arc::new(AtomicBool::new(false));
    let channels = mock.spawn(shutdown.clone()).unwrap();

    let source = RecordSource::Fixed(TelemetryRecord::new(
        11.123456, -10.123456, 90.123456, 47.26045, 11.34712, 914.4,
    ));
    let config = SenderConfig {
        peer: peer(),
        interval: Duration::from_millis(1),
        count: Some(2),
    };

    let sent = run_sender(&source, &TelemetryCodec::default(), &config, &channels.tx, shutdown).await;
    assert_eq!(sent, 2);

    tokio::time::sleep(Duration::from_millis(50)).await;

    let data = captured.lock().await;
    assert_eq!(data.len(), 2);
    assert_eq!(data[0].peer, peer());
    assert_eq!(
        data[0].payload.as_ref(),
        b"11.123456 -10.123456 90.123456 47.260450 11.347120 914.400000"
    );
}

#[tokio::test]
async fn test_listener_applies_mock_datagrams() {
    let mock = MockTransport::new(vec![
        text("1 2 3 4 5 6"),
        text("not a record"),
        text("11.123456 -10.123456 90.123456 47.26045 11.34712 914.4"),
    ]);
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut channels = mock.spawn(shutdown.clone()).unwrap();

    let sink = SharedStateSink::new();
    let stats = Arc::new(Stats::new());
    let mut listener = Listener::new(TelemetryCodec::default(), sink.clone(), stats.clone())
        .with_tick_interval(Duration::from_millis(2))
        .with_listening(true);
    let (_cmd_tx, mut cmd_rx) = mpsc::channel(4);

    // Mock closes its channel after the last datagram, which ends the run
    tokio::time::timeout(
        Duration::from_secs(2),
        listener.run(&mut channels.rx, &mut cmd_rx, shutdown),
    )
    .await
    .expect("listener did not stop");

    let state = sink.snapshot();
    assert_eq!(state.latitude_deg, 47.26045);
    assert_eq!(state.longitude_deg, 11.34712);
    assert_eq!(state.altitude_m, 914.4);
    assert_eq!(state.theta, -10.123456f32);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.decoded, 2);
    assert_eq!(snapshot.malformed, 1);
    assert_eq!(listener.last_peer(), Some(peer()));
}

#[tokio::test]
async fn test_listener_ignores_traffic_when_not_listening() {
    let mock = MockTransport::new(vec![text("1 1 1 1 1 1")]);
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut channels = mock.spawn(shutdown.clone()).unwrap();

    let sink = SharedStateSink::new();
    let mut listener = Listener::new(
        TelemetryCodec::with_policy(DecodePolicy::Strict),
        sink.clone(),
        Arc::new(Stats::new()),
    )
    .with_tick_interval(Duration::from_millis(2));
    let (_cmd_tx, mut cmd_rx) = mpsc::channel(4);

    tokio::time::timeout(
        Duration::from_secs(2),
        listener.run(&mut channels.rx, &mut cmd_rx, shutdown),
    )
    .await
    .expect("listener did not stop");

    assert!(!listener.is_listening());
    assert_eq!(sink.snapshot().updates, 0);
}

#[tokio::test]
async fn test_listener_toggle_resumes_applying() {
    let (tx, mut rx) = mpsc::channel(8);
    let sink = SharedStateSink::new();
    let stats = Arc::new(Stats::new());
    let mut listener = Listener::new(TelemetryCodec::default(), sink.clone(), stats.clone());

    tx.send(text("1 1 1 1 1 1")).await.unwrap();
    listener.tick(&mut rx);
    assert_eq!(sink.snapshot().updates, 0);

    listener.handle_command(ListenerCommand::Toggle);
    assert!(listener.is_listening());

    tx.send(text("2 2 2 2 2 2")).await.unwrap();
    listener.tick(&mut rx);

    let state = sink.snapshot();
    assert_eq!(state.updates, 1);
    assert_eq!(state.altitude_m, 2.0);
    assert_eq!(stats.snapshot().decoded, 1);
}

// =============================================================================
// Loopback UDP tests
// =============================================================================

#[tokio::test]
async fn test_udp_sender_to_listener() {
    let port = free_udp_port();
    let target: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let shutdown = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(Stats::new());

    let mut receiver = UdpTransport::new(target, 4096, stats.clone())
        .spawn(shutdown.clone())
        .unwrap();
    let sender = UdpTransport::new("127.0.0.1:0".parse().unwrap(), 4096, stats.clone())
        .spawn(shutdown.clone())
        .unwrap();

    let sink = SharedStateSink::new();
    let mut listener = Listener::new(TelemetryCodec::default(), sink.clone(), stats.clone())
        .with_tick_interval(Duration::from_millis(5));
    let (cmd_tx, mut cmd_rx) = mpsc::channel(4);
    cmd_tx.send(ListenerCommand::Start).await.unwrap();

    let listen_shutdown = Arc::new(AtomicBool::new(false));
    let listen_flag = listen_shutdown.clone();
    let listen = tokio::spawn(async move {
        listener
            .run(&mut receiver.rx, &mut cmd_rx, listen_flag)
            .await;
        listener
    });

    let source = RecordSource::Fixed(TelemetryRecord::new(1.5, -2.5, 270.0, -33.9, 151.2, 58.0));
    let config = SenderConfig {
        peer: target,
        interval: Duration::from_millis(20),
        count: Some(3),
    };
    run_sender(&source, &TelemetryCodec::default(), &config, &sender.tx, shutdown.clone()).await;

    // Wait until the sink has seen the record
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while sink.snapshot().updates == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    listen_shutdown.store(true, Ordering::SeqCst);
    shutdown.store(true, Ordering::SeqCst);
    let listener = listen.await.unwrap();

    let state = sink.snapshot();
    assert!(state.updates >= 1);
    assert_eq!(state.phi, 1.5);
    assert_eq!(state.theta, -2.5);
    assert_eq!(state.psi, 270.0);
    assert_eq!(state.latitude_deg, -33.9);
    assert_eq!(state.longitude_deg, 151.2);
    assert_eq!(state.altitude_m, 58.0);
    assert!(listener.is_listening());
}
