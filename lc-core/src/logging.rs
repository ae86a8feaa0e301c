//! Crate-standard logging setup.
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `verbosity` is anything `EnvFilter` understands: a bare level (`info`, `debug`) or a full
/// directive list such as `lc_partition=debug,warn`. An unparseable string falls back to `info`.
/// Calling this more than once is harmless; later calls leave the first subscriber in place.
pub fn setup(verbosity: &str) {
    let filter = EnvFilter::try_new(verbosity).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
