//! Logging utilities
//!
//! Installs `env_logger` with every level enabled and steers verbosity
//! through `log::set_max_level`, so the operator console can change it
//! while the server runs. `RUST_LOG`, when set, still filters the output.

use log::LevelFilter;

/// Setup logging for the server at the given verbosity
pub fn setup_logging(level: LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(LevelFilter::Trace)
        .parse_default_env()
        .try_init();

    if let Err(e) = result {
        eprintln!("Logger already initialized: {}", e);
    }
    set_level(level);
}

/// Change the active verbosity
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

/// Parse a level name (`off`, `error`, `warn`, `info`, `debug`, `trace`)
/// or a numeric syslog-style level from 0 to 8.
pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    let raw = raw.trim();
    if let Ok(level) = raw.parse::<u8>() {
        return match level {
            0..=3 => Some(LevelFilter::Error),
            4 => Some(LevelFilter::Warn),
            5 | 6 => Some(LevelFilter::Info),
            7 => Some(LevelFilter::Debug),
            8 => Some(LevelFilter::Trace),
            _ => None,
        };
    }
    raw.parse::<LevelFilter>().ok()
}
