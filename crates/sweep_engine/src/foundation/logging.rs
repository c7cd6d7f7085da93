//! Logging setup
//!
//! The library only emits through the `log` facade. Binaries and tests pick
//! `env_logger` as the backend through these helpers; `RUST_LOG` always wins
//! over the default level.

use env_logger::Builder;

pub use log::LevelFilter;

fn builder(default_level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder.filter_level(default_level).parse_default_env();
    builder
}

/// Install the logger for a binary
///
/// Panics if a logger is already installed.
pub fn init(default_level: LevelFilter) {
    builder(default_level).init();
}

/// Install a test-friendly logger, ignoring one that is already installed
pub fn try_init_for_tests() -> bool {
    builder(LevelFilter::Debug).is_test(true).try_init().is_ok()
}
