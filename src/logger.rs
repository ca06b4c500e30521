use slog::Drain;
use slog_atomic::{AtomicSwitch, AtomicSwitchCtrl};
use slog_term::{CompactFormat, TermDecorator};
use std::io;
use std::sync::Mutex;

use eyre::{Result, eyre};
use slog::*;

use crate::helpers::datetime::{log_timestamp, now_local};

pub const DEFAULT_LOG_LEVEL: u8 = 3;

type TermDrain = Fuse<Mutex<Fuse<LevelFilter<CompactFormat<TermDecorator>>>>>;

/// Maps the 0 (critical) to 5 (trace) verbosity scale onto slog levels.
pub fn level_from_u8(log_level: u8) -> Level {
    match log_level {
        0 => Level::Critical,
        1 => Level::Error,
        2 => Level::Warning,
        3 => Level::Info,
        4 => Level::Debug,
        _ => Level::Trace,
    }
}

fn new_drain(level: Level) -> TermDrain {
    // Logs go to stderr, stdout carries deposit data only
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator)
        .use_custom_timestamp(|w: &mut dyn io::Write| {
            write!(w, "{}", log_timestamp(&now_local()))
        })
        .build()
        .filter_level(level)
        .fuse();
    Mutex::new(drain).fuse()
}

pub struct Logger {
    log_level: Mutex<u8>,
    root: slog::Logger,
    ctrl: AtomicSwitchCtrl,
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new(DEFAULT_LOG_LEVEL)
    }
}

impl Logger {
    pub fn new(log_level: u8) -> Self {
        let drain = AtomicSwitch::new(new_drain(level_from_u8(log_level)));
        let ctrl = drain.ctrl();
        let root = slog::Logger::root(drain, slog::o!("version" => env!("CARGO_PKG_VERSION")));
        Logger {
            log_level: Mutex::new(log_level),
            root,
            ctrl,
        }
    }

    /// Routes the `log` facade through this logger.
    pub fn set_global(&self) -> Result<&Self> {
        // slog_stdlog uses the logger from slog_scope, so set a logger there
        let guard = slog_scope::set_global_logger(self.root.clone());
        // https://github.com/slog-rs/slog/issues/249
        guard.cancel_reset();
        slog_stdlog::init().map_err(|e| eyre!("failed to install logger: {}", e))?;
        Ok(self)
    }

    pub fn log_level(&self) -> u8 {
        self.log_level.lock().map(|ll| *ll).unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn set_log_level(&self, log_level: u8) -> &Self {
        self.ctrl.set(new_drain(level_from_u8(log_level)));
        if let Ok(mut ll) = self.log_level.lock() {
            *ll = log_level;
        }
        self
    }

    /// Quiet mode: only critical messages get through.
    pub fn set_quiet(&self) -> &Self {
        self.set_log_level(0)
    }
}
