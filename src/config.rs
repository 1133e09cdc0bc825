//! Configuration management
//!
//! Config file is `config.toml` next to the executable, or the path given
//! with `--config`. Every section and field is optional.

use crate::codec::{DecodePolicy, TelemetryCodec};
use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_DESTINATION, DEFAULT_MAX_DATAGRAM_LEN, DEFAULT_PRECISION,
    DEFAULT_SEND_INTERVAL_SECS, DEFAULT_TICK_INTERVAL_MS, DEFAULT_UDP_PORT, MAX_PRECISION,
    MAX_UDP_PAYLOAD, MIN_MAX_DATAGRAM_LEN,
};
use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub codec: CodecConfig,
    pub listener: ListenerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address receivers bind to
    pub bind_address: String,
    /// Telemetry UDP port (receivers bind it, senders target it)
    pub port: u16,
    /// Host the sender targets
    pub destination: String,
    /// Delay between two sends
    pub send_interval_secs: f64,
    /// Largest accepted datagram payload
    pub max_datagram_len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Fractional digits written per field
    pub precision: usize,
    /// What the decoder does with bad or surplus tokens
    pub policy: DecodePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Delay between two listener ticks
    pub tick_interval_ms: u64,
    /// Apply incoming records from the first tick on
    pub start_listening: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_UDP_PORT,
            destination: DEFAULT_DESTINATION.to_string(),
            send_interval_secs: DEFAULT_SEND_INTERVAL_SECS,
            max_datagram_len: DEFAULT_MAX_DATAGRAM_LEN,
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            policy: DecodePolicy::default(),
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            start_listening: false,
        }
    }
}

impl Config {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let invalid = |field, reason: String| Err(TelemetryError::ConfigValidation { field, reason });

        if self.network.port == 0 {
            return invalid("network.port", "must be non-zero".into());
        }
        if self.network.bind_address.parse::<IpAddr>().is_err() {
            return invalid(
                "network.bind_address",
                format!("not an IP address: {:?}", self.network.bind_address),
            );
        }
        if self.network.destination.is_empty() {
            return invalid("network.destination", "must not be empty".into());
        }
        if !(self.network.send_interval_secs.is_finite() && self.network.send_interval_secs > 0.0)
        {
            return invalid(
                "network.send_interval_secs",
                format!("must be positive, got {}", self.network.send_interval_secs),
            );
        }
        if !(MIN_MAX_DATAGRAM_LEN..=MAX_UDP_PAYLOAD).contains(&self.network.max_datagram_len) {
            return invalid(
                "network.max_datagram_len",
                format!(
                    "must be in {}..={}, got {}",
                    MIN_MAX_DATAGRAM_LEN, MAX_UDP_PAYLOAD, self.network.max_datagram_len
                ),
            );
        }
        check_precision("codec.precision", self.codec.precision)?;
        if self.listener.tick_interval_ms == 0 {
            return invalid("listener.tick_interval_ms", "must be non-zero".into());
        }
        Ok(())
    }

    /// Codec built from the `[codec]` and `[network]` sections
    pub fn telemetry_codec(&self) -> TelemetryCodec {
        TelemetryCodec::new(
            self.codec.policy,
            self.codec.precision,
            self.network.max_datagram_len,
        )
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_secs_f64(self.network.send_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.listener.tick_interval_ms)
    }
}

/// Reject encode precisions above [`MAX_PRECISION`] fractional digits
pub fn check_precision(field: &'static str, precision: usize) -> Result<usize> {
    if precision > MAX_PRECISION {
        return Err(TelemetryError::ConfigValidation {
            field,
            reason: format!("must be at most {}, got {}", MAX_PRECISION, precision),
        });
    }
    Ok(precision)
}

// =============================================================================
// Loading
// =============================================================================

/// Default config file path: `config.toml` next to the executable
pub fn config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| TelemetryError::ConfigRead {
        path: PathBuf::from("executable"),
        source: e,
    })?;
    let exe_dir = exe.parent().ok_or_else(|| TelemetryError::ConfigValidation {
        field: "exe_path",
        reason: "no parent directory".into(),
    })?;
    Ok(exe_dir.join("config.toml"))
}

/// Parse config from TOML text
pub fn parse(content: &str, path: &Path) -> Result<Config> {
    toml::from_str(content).map_err(|e| TelemetryError::ConfigParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load and validate an explicitly requested config file
pub fn load_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| TelemetryError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = parse(&content, path)?;
    config.validate()?;
    Ok(config)
}

/// Load config from the default location, falling back to defaults
pub fn load() -> Config {
    let path = match config_path() {
        Ok(p) => p,
        Err(e) => {
            warn!("Failed to determine config path: {}, using defaults", e);
            return Config::default();
        }
    };

    if !path.exists() {
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}, using defaults", e);
            Config::default()
        }
    }
}

/// Save config to file
pub fn save(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|e| TelemetryError::ConfigValidation {
        field: "config",
        reason: e.to_string(),
    })?;
    fs::write(path, content).map_err(|e| TelemetryError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a default config file to `path`
///
/// An existing file is left alone unless `overwrite` is set.
pub fn write_default(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(TelemetryError::ConfigValidation {
            field: "config",
            reason: format!("{} already exists (use --force to overwrite)", path.display()),
        });
    }
    save(&Config::default(), path)
}

// ============================================================================
// Tests
// ============================================================================
