//! Raw pass-through codec
//!
//! Performs no transformation on data:
//! - decode: the payload up to its first NUL byte
//! - encode: pass-through (copies bytes directly)
//!
//! Used for free-form text datagrams, e.g. probing a receiver with a test
//! string or printing whatever arrived on the port.

use super::{until_nul, DatagramCodec};
use crate::error::MalformedDatagram;
use bytes::Bytes;

/// Pass-through codec for raw datagrams
pub struct RawCodec {
    max_len: usize,
}

impl RawCodec {
    /// Create a new RawCodec accepting payloads up to `max_len` bytes
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

impl DatagramCodec for RawCodec {
    type Item = Bytes;

    fn decode(&self, payload: &[u8]) -> Result<Bytes, MalformedDatagram> {
        if payload.len() > self.max_len {
            return Err(MalformedDatagram::Oversized {
                len: payload.len(),
                max: self.max_len,
            });
        }
        Ok(Bytes::copy_from_slice(until_nul(payload)))
    }

    fn encode(&self, payload: &Bytes, output: &mut Vec<u8>) {
        output.extend_from_slice(payload);
    }
}
