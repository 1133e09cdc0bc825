//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.
//! Options left unset fall back to the config file.

use crate::codec::DecodePolicy;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Telemetry datagram tools: send, receive, listen, decode, encode
#[derive(Parser, Debug)]
#[command(name = "uw-telemetry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: config.toml next to the executable)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a telemetry datagram periodically
    Send(SendArgs),

    /// Wait for one datagram and print it
    Receive(ReceiveArgs),

    /// Apply incoming datagrams to vehicle state on a fixed tick
    ///
    /// Press Enter to toggle listening on/off.
    Listen(ListenArgs),

    /// Decode a payload given on the command line
    Decode {
        /// Payload text, e.g. "11.123456 -10.123456 90.123456 47.26045 11.34712 914.4"
        #[arg(allow_hyphen_values = true)]
        payload: String,

        /// Decode policy (overrides config)
        #[arg(long, value_enum)]
        policy: Option<DecodePolicy>,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode six values into a payload
    Encode {
        /// phi theta psi latitude longitude altitude
        #[arg(num_args = 6, value_names = ["PHI", "THETA", "PSI", "LAT", "LON", "ALT"], allow_negative_numbers = true)]
        values: Vec<f64>,

        /// Fractional digits per field (overrides config)
        #[arg(long)]
        precision: Option<usize>,
    },

    /// Write a config file with default values to the config path
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by commands that bind a receiving socket
#[derive(Args, Debug, Default, Clone)]
pub struct BindArgs {
    /// Address to bind (overrides config)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// UDP port to bind (overrides config)
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["file", "raw", "record"])))]
pub struct SendArgs {
    /// Destination host (overrides config)
    #[arg(long, value_name = "HOST")]
    pub to: Option<String>,

    /// Destination port (overrides config)
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Seconds between sends (overrides config)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<f64>,

    /// Stop after this many datagrams
    #[arg(long, value_name = "N")]
    pub count: Option<u64>,

    /// Read the record from a text file before every send
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Send free-form text instead of a record
    #[arg(long, value_name = "TEXT")]
    pub raw: Option<String>,

    /// Record to send: phi theta psi latitude longitude altitude
    #[arg(long, num_args = 6, value_names = ["PHI", "THETA", "PSI", "LAT", "LON", "ALT"], allow_negative_numbers = true)]
    pub record: Option<Vec<f64>>,

    /// Refuse records whose latitude/longitude are out of range
    #[arg(long)]
    pub check_ranges: bool,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    #[command(flatten)]
    pub bind: BindArgs,

    /// Print the payload as text without decoding it
    #[arg(long, conflicts_with = "json")]
    pub raw: bool,

    /// Print the decoded record as JSON
    #[arg(long)]
    pub json: bool,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub bind: BindArgs,

    /// Start with listening on (overrides config)
    #[arg(long)]
    pub start_listening: bool,
}

// =============================================================================
// Tests
// =============================================================================
