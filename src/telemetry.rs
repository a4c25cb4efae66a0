//! Tracing setup.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `verbosity` is the number of `-v` flags the embedding binary saw; an
/// explicit `RUST_LOG` always wins. Safe to call more than once (later
/// calls are no-ops).
pub fn init(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("faceoff={default}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
