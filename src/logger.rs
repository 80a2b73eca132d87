//! Tracing subscriber setup for the simulator binary.

use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::FmtSubscriber;

/// Install a stderr subscriber. Verbose runs get per-step battle records
/// (`DEBUG`); quiet runs only progress and warnings (`INFO`).
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = set_global_default(subscriber);
}
