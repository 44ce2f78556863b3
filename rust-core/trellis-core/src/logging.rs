//! # Logging
//!
//! Installs the global `tracing` subscriber. The library itself only emits
//! events; calling [`init_tracing`] is up to the host.

use crate::config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for the library
///
/// Safe to call more than once: later calls are ignored.
pub fn init_tracing(config: &LogConfig) {
    let mut filter = EnvFilter::from_default_env();
    match config.directive.parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("ignoring log directive {:?}: {e}", config.directive),
    }

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
