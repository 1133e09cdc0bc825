//! Codec abstraction for datagram encoding/decoding
//!
//! Separates encoding concerns from transport:
//! - **Codec**: How one datagram payload maps to an item (telemetry text, raw)
//! - **Transport**: How datagrams flow (UDP)
//!
//! Every datagram carries exactly one item; there is no framing beyond the
//! datagram boundary.

pub mod raw;
pub mod telemetry;

pub use raw::RawCodec;
pub use telemetry::{DecodePolicy, TelemetryCodec};

use crate::error::MalformedDatagram;

/// Codec trait for one-item-per-datagram payloads
///
/// Implementations are stateless: `decode` and `encode` are pure functions
/// of their input, safe to share between tasks.
pub trait DatagramCodec: Send + Sync {
    /// Decoded item
    type Item;

    /// Decode one datagram payload
    fn decode(&self, payload: &[u8]) -> Result<Self::Item, MalformedDatagram>;

    /// Encode an item for transmission
    ///
    /// Appends encoded bytes to `output`.
    fn encode(&self, item: &Self::Item, output: &mut Vec<u8>);
}

/// Payload up to the first NUL byte
///
/// Senders written in C sometimes transmit their string terminator.
pub(crate) fn until_nul(payload: &[u8]) -> &[u8] {
    match payload.iter().position(|&b| b == 0) {
        Some(end) => &payload[..end],
        None => payload,
    }
}
