//! Datagram statistics
//!
//! Thread-safe counters shared by the transport, sender and listener.
//! Uses lock-free atomics for all operations.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Datagram counters (fully lock-free)
#[derive(Debug, Default)]
pub struct Stats {
    /// Datagrams handed to the socket
    sent: AtomicU64,
    /// Datagrams the socket refused to send
    send_failed: AtomicU64,
    /// Datagrams received from the socket
    received: AtomicU64,
    /// Payloads decoded into a record
    decoded: AtomicU64,
    /// Payloads rejected by the codec
    malformed: AtomicU64,
    /// Datagrams dropped for exceeding the receive limit
    oversized: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub sent: u64,
    pub send_failed: u64,
    pub received: u64,
    pub decoded: u64,
    pub malformed: u64,
    pub oversized: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_send_failed(&self) {
        self.send_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_oversized(&self) {
        self.oversized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            send_failed: self.send_failed.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            oversized: self.oversized.load(Ordering::Relaxed),
        }
    }
}
