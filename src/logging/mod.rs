//! Logging setup
//!
//! Library code logs through `tracing` macros; the binary installs the
//! subscriber once, early in `main`.

/// Initialize tracing output on stderr
///
/// Call early in main() before any logging occurs.
/// `verbose` raises the default level from `info` to `debug`; `RUST_LOG`
/// overrides both.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(filter)
        .try_init();
}

/// Filter directive used when `RUST_LOG` is unset
fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        // Applied records are logged at info and must show without -v
        assert_eq!(default_level(false), "info");
        assert_eq!(default_level(true), "debug");
    }
}
