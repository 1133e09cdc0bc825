//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Network
// =============================================================================

/// Default UDP port for telemetry datagrams
pub const DEFAULT_UDP_PORT: u16 = 49003;

/// Default address receivers bind to
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Default destination host for the sender
pub const DEFAULT_DESTINATION: &str = "127.0.0.1";

// =============================================================================
// Timing
// =============================================================================

/// Delay between two datagrams sent by the periodic sender (seconds)
pub const DEFAULT_SEND_INTERVAL_SECS: f64 = 3.0;

/// Interval between two listener ticks (milliseconds)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// Poll interval used by transport tasks to check the shutdown flag (milliseconds)
pub const SHUTDOWN_POLL_MS: u64 = 100;

// =============================================================================
// Retry
// =============================================================================

/// Maximum socket bind retry attempts
pub const MAX_SOCKET_RETRY_ATTEMPTS: u32 = 5;

/// Base delay between retry attempts (milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 200;

// =============================================================================
// Wire format
// =============================================================================

/// Number of numeric fields in a telemetry record
pub const FIELD_COUNT: usize = 6;

/// Fractional digits written by the encoder
pub const DEFAULT_PRECISION: usize = 6;

/// Largest precision accepted by config validation
pub const MAX_PRECISION: usize = 17;

// =============================================================================
// Buffers
// =============================================================================

/// Largest datagram payload accepted by the decoder and the receiver
pub const DEFAULT_MAX_DATAGRAM_LEN: usize = 4096;

/// Lower bound for a configured maximum datagram length
pub const MIN_MAX_DATAGRAM_LEN: usize = 64;

/// Largest payload a UDP/IPv4 datagram can carry
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Channel capacity for async message passing
pub const CHANNEL_CAPACITY: usize = 256;
