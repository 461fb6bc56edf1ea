//! Tracing setup for the binaries

use tracing_subscriber::{prelude::*, EnvFilter};

/// Install a global subscriber filtered by `RUST_LOG`, `info` when unset.
///
/// Logs go to stderr so stdout stays free for data. Calling this twice is
/// harmless: the second subscriber is ignored.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let _ = tracing::subscriber::set_global_default(subscriber);
}
