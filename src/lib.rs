// Hostwatch Library - Public API

// Re-export error types
pub mod error;
pub use error::{HostwatchError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod ui;

// Re-export commonly used types
pub use core::config::Config;
pub use core::stats::Stats;

// Initialize logging
pub fn init_logging() {
    init_logging_with(false);
}

/// Info by default, Debug with `debug`; `RUST_LOG` still overrides either.
pub fn init_logging_with(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
