#![deny(missing_docs)]
//! Shared logging setup for the exporter workspace.
//!
//! The library crates log through the `log` facade only; the CLI and the
//! test suites pick a concrete `simplelog` backend via the initializers
//! below.

use log::LevelFilter;
use simplelog::{ColorChoice, Config, ConfigBuilder, TermLogger, TerminalMode};

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

/// Initializes a terminal logger for the CLI at the given level.
///
/// Safely no-ops if a global logger is already installed.
pub fn initialize_terminal(level: LevelFilter) {
    let _ = TermLogger::init(
        level,
        build_config(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}
