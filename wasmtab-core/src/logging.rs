//! Stderr sink for the `log` facade.
//!
//! Lines are prefixed with `[wasmtab]`. The level comes from `WASMTAB_LOG`
//! (`off`, `error`, `warn`, `info`, `debug`, `trace`) and defaults to `warn`.

use log::{LevelFilter, Log, Metadata, Record};

pub const LEVEL_ENV: &str = "WASMTAB_LOG";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[wasmtab] {}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Parse a level name; unknown names yield `None`.
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}

/// Install the stderr logger. Later calls (or another logger already being set) are ignored.
pub fn init() {
    let level = std::env::var(LEVEL_ENV)
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(LevelFilter::Warn);

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
