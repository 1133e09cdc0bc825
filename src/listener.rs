//! Tick-driven telemetry listener
//!
//! Owns the per-instance state a position plugin needs between callbacks:
//! whether it is listening, the codec, the sink, and the last peer seen.
//! Each [`Listener::tick`] drains the datagrams queued since the previous
//! tick and applies the newest valid record to the sink. A tick never
//! waits for the network, so the caller's frame loop never stalls.

use crate::codec::{DatagramCodec, TelemetryCodec};
use crate::constants::DEFAULT_TICK_INTERVAL_MS;
use crate::record::TelemetryRecord;
use crate::sink::PositionSink;
use crate::stats::Stats;
use crate::transport::Datagram;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

/// Control messages accepted while the listener runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerCommand {
    Start,
    Stop,
    Toggle,
}

/// Telemetry listener bound to one sink
pub struct Listener<S: PositionSink> {
    codec: TelemetryCodec,
    sink: S,
    stats: Arc<Stats>,
    tick_interval: Duration,
    listening: bool,
    closed: bool,
    last_peer: Option<SocketAddr>,
    last_record: Option<TelemetryRecord>,
}

impl<S: PositionSink> Listener<S> {
    /// Create a listener; it starts with listening off
    pub fn new(codec: TelemetryCodec, sink: S, stats: Arc<Stats>) -> Self {
        Self {
            codec,
            sink,
            stats,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            listening: false,
            closed: false,
            last_peer: None,
            last_record: None,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_listening(mut self, listening: bool) -> Self {
        self.listening = listening;
        self
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn set_listening(&mut self, listening: bool) {
        if self.listening != listening {
            info!("Listening {}", if listening { "on" } else { "off" });
        }
        self.listening = listening;
    }

    /// Flip the listening state, returning the new state
    pub fn toggle_listening(&mut self) -> bool {
        self.set_listening(!self.listening);
        self.listening
    }

    /// True once the transport channel has closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn last_peer(&self) -> Option<SocketAddr> {
        self.last_peer
    }

    /// Most recent record applied to the sink
    pub fn last_record(&self) -> Option<TelemetryRecord> {
        self.last_record
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn handle_command(&mut self, command: ListenerCommand) {
        match command {
            ListenerCommand::Start => self.set_listening(true),
            ListenerCommand::Stop => self.set_listening(false),
            ListenerCommand::Toggle => {
                self.toggle_listening();
            }
        }
    }

    /// Process everything queued since the previous tick
    ///
    /// Returns the delay until the next tick should run.
    pub fn tick(&mut self, rx: &mut mpsc::Receiver<Datagram>) -> Duration {
        let mut newest: Option<(TelemetryRecord, SocketAddr)> = None;
        let mut discarded = 0usize;

        loop {
            match rx.try_recv() {
                Ok(datagram) if self.listening => {
                    if let Some(record) = self.decode(&datagram) {
                        newest = Some((record, datagram.peer));
                    }
                }
                Ok(_) => discarded += 1,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }

        if discarded > 0 {
            debug!("Not listening, discarded {} datagram(s)", discarded);
        }

        if let Some((record, peer)) = newest {
            self.sink.apply(&record);
            self.last_peer = Some(peer);
            self.last_record = Some(record);
        }

        self.tick_interval
    }

    /// Run ticks until shutdown or until the transport closes
    pub async fn run(
        &mut self,
        rx: &mut mpsc::Receiver<Datagram>,
        commands: &mut mpsc::Receiver<ListenerCommand>,
        shutdown: Arc<AtomicBool>,
    ) {
        while !shutdown.load(Ordering::Relaxed) {
            while let Ok(command) = commands.try_recv() {
                self.handle_command(command);
            }

            let next = self.tick(rx);
            if self.closed {
                info!("Transport closed, listener stopping");
                break;
            }
            tokio::time::sleep(next).await;
        }
    }

    fn decode(&self, datagram: &Datagram) -> Option<TelemetryRecord> {
        match self.codec.decode(&datagram.payload) {
            Ok(record) => {
                self.stats.add_decoded();
                Some(record)
            }
            Err(e) => {
                self.stats.add_malformed();
                warn!("Dropped datagram from {}: {}", datagram.peer, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SharedStateSink;

    fn peer() -> SocketAddr {
        "10.0.0.7:40000".parse().unwrap()
    }

    fn datagram(text: &str) -> Datagram {
        Datagram::new(text.as_bytes().to_vec(), peer())
    }

    fn listener() -> (Listener<SharedStateSink>, SharedStateSink, Arc<Stats>) {
        let sink = SharedStateSink::new();
        let stats = Arc::new(Stats::new());
        let listener = Listener::new(TelemetryCodec::default(), sink.clone(), stats.clone());
        (listener, sink, stats)
    }

    #[test]
    fn test_starts_not_listening() {
        let (listener, _, _) = listener();
        assert!(!listener.is_listening());
    }

    #[test]
    fn test_toggle_listening() {
        let (mut listener, _, _) = listener();
        assert!(listener.toggle_listening());
        assert!(!listener.toggle_listening());

        listener.handle_command(ListenerCommand::Start);
        assert!(listener.is_listening());
        listener.handle_command(ListenerCommand::Stop);
        assert!(!listener.is_listening());
    }

    #[test]
    fn test_tick_applies_newest_record() {
        let (listener, sink, stats) = listener();
        let mut listener = listener.with_listening(true);
        let (tx, mut rx) = mpsc::channel(8);

        tx.try_send(datagram("1 2 3 4 5 6")).unwrap();
        tx.try_send(datagram("7 8 9 10 11 12")).unwrap();

        let next = listener.tick(&mut rx);

        assert_eq!(next, Duration::from_millis(DEFAULT_TICK_INTERVAL_MS));
        let state = sink.snapshot();
        assert_eq!(state.updates, 1);
        assert_eq!(state.phi, 7.0);
        assert_eq!(state.altitude_m, 12.0);
        assert_eq!(listener.last_peer(), Some(peer()));
        assert_eq!(stats.snapshot().decoded, 2);
    }

    #[test]
    fn test_tick_skips_malformed() {
        let (listener, sink, stats) = listener();
        let mut listener = listener.with_listening(true);
        let (tx, mut rx) = mpsc::channel(8);

        tx.try_send(datagram("1 2 3 4 5 6")).unwrap();
        tx.try_send(datagram("1 2 3 4 5")).unwrap();

        listener.tick(&mut rx);

        assert_eq!(sink.snapshot().altitude_m, 6.0);
        assert_eq!(stats.snapshot().malformed, 1);
    }

    #[test]
    fn test_tick_discards_when_not_listening() {
        let (mut listener, sink, stats) = listener();
        let (tx, mut rx) = mpsc::channel(8);

        tx.try_send(datagram("1 2 3 4 5 6")).unwrap();
        listener.tick(&mut rx);

        assert_eq!(sink.snapshot().updates, 0);
        assert_eq!(stats.snapshot().decoded, 0);
        assert!(listener.last_record().is_none());

        // Discarded datagrams are not replayed once listening starts
        listener.set_listening(true);
        listener.tick(&mut rx);
        assert_eq!(sink.snapshot().updates, 0);
    }

    #[test]
    fn test_tick_with_nothing_queued() {
        let (listener, sink, _) = listener();
        let mut listener = listener.with_listening(true);
        let (_tx, mut rx) = mpsc::channel::<Datagram>(8);

        listener.tick(&mut rx);

        assert_eq!(sink.snapshot().updates, 0);
        assert!(!listener.is_closed());
    }

    #[test]
    fn test_tick_detects_closed_channel() {
        let (mut listener, _, _) = listener();
        let (tx, mut rx) = mpsc::channel::<Datagram>(8);
        drop(tx);

        listener.tick(&mut rx);
        assert!(listener.is_closed());
    }

    #[tokio::test]
    async fn test_run_stops_when_transport_closes() {
        let (listener, sink, _) = listener();
        let mut listener = listener.with_tick_interval(Duration::from_millis(5));
        let (tx, mut rx) = mpsc::channel(8);
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);

        cmd_tx.send(ListenerCommand::Toggle).await.unwrap();
        tx.send(datagram("0.5 0.25 180 47.26045 11.34712 914.4"))
            .await
            .unwrap();
        drop(tx);

        let shutdown = Arc::new(AtomicBool::new(false));
        tokio::time::timeout(
            Duration::from_secs(1),
            listener.run(&mut rx, &mut cmd_rx, shutdown),
        )
        .await
        .expect("listener did not stop");

        assert!(listener.is_listening());
        assert_eq!(sink.snapshot().psi, 180.0);
    }
}
