//! uw-telemetry - telemetry datagram tools
//!
//! Usage:
//!   uw-telemetry send --record PHI THETA PSI LAT LON ALT   Resend a record every 3s
//!   uw-telemetry send --file record.txt                    Resend the record in a file
//!   uw-telemetry receive [--raw|--json]                    Print one datagram
//!   uw-telemetry listen [--start-listening]                Apply datagrams on a 50ms tick
//!   uw-telemetry decode "<payload>"                        Decode text offline
//!   uw-telemetry encode PHI THETA PSI LAT LON ALT          Encode values offline
//!   uw-telemetry init-config [--force]                     Write a default config file

use clap::Parser;
use std::io::BufRead;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use uw_telemetry::cli::{BindArgs, Cli, Command, ListenArgs, ReceiveArgs, SendArgs};
use uw_telemetry::codec::{DatagramCodec, RawCodec, TelemetryCodec};
use uw_telemetry::config::{self, Config};
use uw_telemetry::error::{Result, TelemetryError};
use uw_telemetry::listener::{Listener, ListenerCommand};
use uw_telemetry::logging;
use uw_telemetry::record::TelemetryRecord;
use uw_telemetry::sender::{run_sender, SenderConfig};
use uw_telemetry::sink::LogSink;
use uw_telemetry::source::{FileSource, RecordSource};
use uw_telemetry::stats::Stats;
use uw_telemetry::transport::{self, Transport, UdpTransport};

/// How long to wait for queued datagrams to leave the socket on exit
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::InitConfig { force } = cli.command {
        let path = match cli.config {
            Some(path) => path,
            None => config::config_path()?,
        };
        config::write_default(&path, force)?;
        info!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => config::load_from(path)?,
        None => config::load(),
    };

    match cli.command {
        Command::Decode {
            payload,
            policy,
            json,
        } => run_decode(&config, &payload, policy, json),
        Command::Encode { values, precision } => run_encode(&config, &values, precision),
        Command::Send(args) => block_on(run_send(config, args)),
        Command::Receive(args) => block_on(run_receive(config, args)),
        Command::Listen(args) => block_on(run_listen(config, args)),
        Command::InitConfig { .. } => Ok(()),
    }
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| TelemetryError::Runtime { source: e })?;
    rt.block_on(future)
}

// =============================================================================
// Offline commands
// =============================================================================

fn run_decode(
    config: &Config,
    payload: &str,
    policy: Option<uw_telemetry::DecodePolicy>,
    json: bool,
) -> Result<()> {
    let base = config.telemetry_codec();
    let codec = TelemetryCodec::new(
        policy.unwrap_or(base.policy()),
        base.precision(),
        base.max_len(),
    );
    let record = codec.decode(payload.as_bytes())?;
    print_record(&record, json);
    Ok(())
}

fn run_encode(config: &Config, values: &[f64], precision: Option<usize>) -> Result<()> {
    let base = config.telemetry_codec();
    let precision = match precision {
        Some(p) => config::check_precision("precision", p)?,
        None => base.precision(),
    };
    let codec = TelemetryCodec::new(base.policy(), precision, base.max_len());
    let record = record_from_values(values)?;
    println!("{}", String::from_utf8_lossy(&codec.encode_to_vec(&record)));
    Ok(())
}

fn record_from_values(values: &[f64]) -> Result<TelemetryRecord> {
    let fields: [f64; 6] = values
        .try_into()
        .map_err(|_| TelemetryError::ConfigValidation {
            field: "record",
            reason: format!("expected 6 values, got {}", values.len()),
        })?;
    Ok(TelemetryRecord::from_fields(fields))
}

fn print_record(record: &TelemetryRecord, json: bool) {
    if json {
        match serde_json::to_string_pretty(record) {
            Ok(text) => println!("{}", text),
            Err(e) => warn!("Cannot serialize record: {}", e),
        }
        return;
    }
    println!("phi:       {}", record.phi_deg);
    println!("theta:     {}", record.theta_deg);
    println!("psi:       {}", record.psi_deg);
    println!("latitude:  {}", record.latitude_deg);
    println!("longitude: {}", record.longitude_deg);
    println!("altitude:  {}", record.altitude_m);
}

// =============================================================================
// Network commands
// =============================================================================

async fn run_send(config: Config, args: SendArgs) -> Result<()> {
    let host = args.to.unwrap_or_else(|| config.network.destination.clone());
    let port = args.port.unwrap_or(config.network.port);
    let peer = transport::resolve_peer(&host, port)?;

    let interval = match args.interval {
        Some(secs) => positive_secs("interval", secs)?,
        None => config.send_interval(),
    };

    let source = if let Some(path) = args.file {
        RecordSource::File(FileSource::new(path))
    } else if let Some(text) = args.raw {
        RecordSource::Raw(text)
    } else {
        let record = record_from_values(args.record.as_deref().unwrap_or_default())?;
        if args.check_ranges {
            record.validate_ranges().map_err(|v| TelemetryError::ConfigValidation {
                field: "record",
                reason: v.to_string(),
            })?;
        }
        RecordSource::Fixed(record)
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_shutdown_handler(shutdown.clone());

    let stats = Arc::new(Stats::new());
    let local = unspecified_for(peer.ip(), 0);
    let channels = UdpTransport::new(local, config.network.max_datagram_len, stats.clone())
        .spawn(shutdown.clone())?;

    let sender_config = SenderConfig {
        peer,
        interval,
        count: args.count,
    };
    let codec = config.telemetry_codec();
    let queued = run_sender(&source, &codec, &sender_config, &channels.tx, shutdown).await;
    drop(channels);

    wait_for_flush(&stats, queued).await;
    let snapshot = stats.snapshot();
    info!(
        "Sent {} datagram(s) to {} ({} failed)",
        snapshot.sent, peer, snapshot.send_failed
    );
    Ok(())
}

async fn run_receive(config: Config, args: ReceiveArgs) -> Result<()> {
    let bind_addr = bind_address(&config, &args.bind)?;
    let timeout = args
        .timeout
        .map(|secs| positive_secs("timeout", secs))
        .transpose()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(Stats::new());
    let mut channels = UdpTransport::new(bind_addr, config.network.max_datagram_len, stats)
        .spawn(shutdown.clone())?;

    info!("Waiting for a datagram on {}...", bind_addr);
    let result = transport::recv_one(&mut channels.rx, timeout).await;
    shutdown.store(true, Ordering::SeqCst);
    let datagram = result?;

    println!(
        "[{}] {} bytes from {}",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        datagram.payload.len(),
        datagram.peer
    );

    if args.raw {
        let text = RawCodec::new(config.network.max_datagram_len).decode(&datagram.payload)?;
        println!("{}", String::from_utf8_lossy(&text));
        return Ok(());
    }

    let record = config.telemetry_codec().decode(&datagram.payload)?;
    print_record(&record, args.json);
    Ok(())
}

async fn run_listen(config: Config, args: ListenArgs) -> Result<()> {
    let bind_addr = bind_address(&config, &args.bind)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_shutdown_handler(shutdown.clone());

    let stats = Arc::new(Stats::new());
    let mut channels = UdpTransport::new(bind_addr, config.network.max_datagram_len, stats.clone())
        .spawn(shutdown.clone())?;

    let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
    spawn_toggle_reader(cmd_tx);

    let mut listener = Listener::new(config.telemetry_codec(), LogSink, stats.clone())
        .with_tick_interval(config.tick_interval())
        .with_listening(args.start_listening || config.listener.start_listening);

    info!(
        "Listening on {} (listening {}, press Enter to toggle)",
        bind_addr,
        if listener.is_listening() { "on" } else { "off" }
    );
    listener
        .run(&mut channels.rx, &mut cmd_rx, shutdown.clone())
        .await;
    shutdown.store(true, Ordering::SeqCst);

    let snapshot = stats.snapshot();
    info!(
        "Received {}, decoded {}, malformed {}, oversized {}",
        snapshot.received, snapshot.decoded, snapshot.malformed, snapshot.oversized
    );
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn bind_address(config: &Config, args: &BindArgs) -> Result<SocketAddr> {
    let host = args.bind.as_deref().unwrap_or(&config.network.bind_address);
    let port = args.port.unwrap_or(config.network.port);
    let ip: IpAddr = host.parse().map_err(|_| TelemetryError::AddressResolve {
        host: host.to_string(),
        port,
    })?;
    Ok(SocketAddr::new(ip, port))
}

fn positive_secs(field: &'static str, secs: f64) -> Result<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(TelemetryError::ConfigValidation {
            field,
            reason: format!("must be a positive number of seconds, got {}", secs),
        })
    }
}

/// Wildcard address of the same family as `peer`
fn unspecified_for(peer: IpAddr, port: u16) -> SocketAddr {
    match peer {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port),
    }
}

/// Give the transport's TX task time to drain what the sender queued
async fn wait_for_flush(stats: &Stats, queued: u64) {
    let deadline = Instant::now() + FLUSH_TIMEOUT;
    while Instant::now() < deadline {
        let snapshot = stats.snapshot();
        if snapshot.sent + snapshot.send_failed >= queued {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    warn!("Some datagrams may not have been sent");
}

/// Set `shutdown` on SIGINT/SIGTERM (Ctrl-C on Windows)
fn spawn_shutdown_handler(shutdown: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        tokio::spawn(async move {
            let (Ok(mut sigterm), Ok(mut sigint)) =
                (signal(SignalKind::terminate()), signal(SignalKind::interrupt()))
            else {
                warn!("Cannot install signal handlers");
                return;
            };

            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
            shutdown.store(true, Ordering::SeqCst);
        });
    }

    #[cfg(windows)]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.store(true, Ordering::SeqCst);
        });
    }
}

/// Toggle listening each time a line is read from stdin
fn spawn_toggle_reader(cmd_tx: mpsc::Sender<ListenerCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            if line.is_err() || cmd_tx.blocking_send(ListenerCommand::Toggle).is_err() {
                break;
            }
        }
    });
}
