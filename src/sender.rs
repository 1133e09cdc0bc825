//! Periodic datagram sender
//!
//! Sends the source's payload to one peer, waits, and repeats until the
//! requested count is reached, shutdown is signaled, or the transport closes.

use crate::codec::TelemetryCodec;
use crate::source::RecordSource;
use crate::transport::Datagram;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Sender settings
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub peer: SocketAddr,
    pub interval: Duration,
    /// Stop after this many datagrams (`None` = until shutdown)
    pub count: Option<u64>,
}

/// Send payloads from `source` to `config.peer` through `tx`
///
/// Returns the number of datagrams handed to the transport. A source that
/// fails (missing file, malformed content) skips that round.
pub async fn run_sender(
    source: &RecordSource,
    codec: &TelemetryCodec,
    config: &SenderConfig,
    tx: &mpsc::Sender<Datagram>,
    shutdown: Arc<AtomicBool>,
) -> u64 {
    info!(
        "Sending {} to {} every {:.2}s",
        source.describe(),
        config.peer,
        config.interval.as_secs_f64()
    );

    let mut sent = 0u64;
    while !shutdown.load(Ordering::Relaxed) {
        match source.next_payload(codec) {
            Ok(payload) => {
                debug!("-> {} ({} bytes)", config.peer, payload.len());
                if tx.send(Datagram::new(payload, config.peer)).await.is_err() {
                    warn!("Transport closed, sender stopping");
                    break;
                }
                sent += 1;
            }
            Err(e) => warn!("Skipping send: {}", e),
        }

        if config.count.is_some_and(|limit| sent >= limit) {
            break;
        }
        sleep_unless_shutdown(config.interval, &shutdown).await;
    }
    sent
}

/// Sleep for `duration`, waking early if shutdown is signaled
async fn sleep_unless_shutdown(duration: Duration, shutdown: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = duration;
    while !remaining.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let step = remaining.min(SLICE);
        tokio::time::sleep(step).await;
        remaining -= step;
    }
}
