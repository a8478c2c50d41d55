//! Minimal stderr logger for the `log` facade
//!
//! Lines look like `[ WARN] page fault on page 64: no free frames`, coloured
//! by level when stderr is a terminal.

use core::fmt;
use std::io::IsTerminal;

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Once;

use crate::error::ConfigError;

/// Environment variable that overrides the configured level
pub const LOG_ENV: &str = "PAGESIM_LOG";

/// Level used when nothing is configured
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

static LOGGER: Once<SimpleLogger> = Once::new();

struct SimpleLogger {
    color: bool,
}

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if self.color {
            print_in_color(
                format_args!("[{:>5}] {}", record.level(), record.args()),
                level_to_color_code(record.level()),
            );
        } else {
            eprintln!("[{:>5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn print_in_color(args: fmt::Arguments, color_code: u8) {
    eprintln!("\u{1B}[{}m{}\u{1B}[0m", color_code, args);
}

fn level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31, // Red
        Level::Warn => 93,  // BrightYellow
        Level::Info => 34,  // Blue
        Level::Debug => 32, // Green
        Level::Trace => 90, // BrightBlack
    }
}

/// Install the logger and set the maximum level
///
/// May be called more than once; later calls only change the level.
pub fn init(level: LevelFilter) {
    let logger = LOGGER.call_once(|| SimpleLogger {
        color: std::io::stderr().is_terminal(),
    });
    // Fails only if some other logger is already installed
    let _ = log::set_logger(logger);
    log::set_max_level(level);
}

/// Parse `off`, `error`, `warn`, `info`, `debug` or `trace`
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

/// Pick the level from the command line, the environment and the config
///
/// The first one set wins, in that order.
pub fn select_level(
    flag: Option<&str>,
    env: Option<&str>,
    configured: Option<&str>,
) -> Result<LevelFilter, ConfigError> {
    match flag.or(env).or(configured) {
        Some(name) => parse_level(name).ok_or_else(|| ConfigError::LogLevel(name.to_string())),
        None => Ok(DEFAULT_LEVEL),
    }
}

/// [`select_level`] with the environment read from [`LOG_ENV`]
pub fn resolve_level(
    flag: Option<&str>,
    configured: Option<&str>,
) -> Result<LevelFilter, ConfigError> {
    let env = std::env::var(LOG_ENV).ok();
    select_level(flag, env.as_deref(), configured)
}
