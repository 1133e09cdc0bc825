//! Telemetry datagrams for simulator position plugins
//!
//! A telemetry record (roll, pitch, heading, latitude, longitude, altitude)
//! travels as one line of six space-separated numbers in a UDP datagram.
//! This crate provides the codec for that format plus the pieces around it:
//! a UDP transport, a periodic sender, and a tick-driven listener that
//! applies records to a position sink.

pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod listener;
pub mod logging;
pub mod record;
pub mod sender;
pub mod sink;
pub mod source;
pub mod stats;
pub mod transport;

pub use codec::{DatagramCodec, DecodePolicy, TelemetryCodec};
pub use error::{MalformedDatagram, Result, TelemetryError};
pub use record::{Field, TelemetryRecord};
