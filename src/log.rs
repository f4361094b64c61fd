//! Process-wide fallback logger.
//!
//! The core accepts a [`slog::Logger`] at construction. Callers that don't
//! supply one get this global instead, following the same pattern the rest
//! of this crate's `open3`-backed adapters use: a logger is always
//! available, but *where* its records end up is entirely up to whoever
//! embeds the crate.

use once_cell::sync::OnceCell;
use slog::{o, Drain, Logger as SlogLogger};
use slog_stdlog::StdLog;
use std::ops::Deref;

static GLOBAL_LOGGER: OnceCell<GlobalLogger> = OnceCell::new();

#[derive(Debug, Clone)]
pub struct GlobalLogger {
    inner: SlogLogger,
}

impl Deref for GlobalLogger {
    type Target = SlogLogger;

    fn deref(&self) -> &Self::Target { &self.inner }
}

impl GlobalLogger {
    fn new(logger: SlogLogger) -> Self { GlobalLogger { inner: logger } }

    /// Get the global logger, initializing it with a `slog-stdlog` drain on first use.
    pub fn get() -> &'static GlobalLogger {
        GLOBAL_LOGGER.get_or_init(|| {
            GlobalLogger::new(SlogLogger::root(StdLog.fuse(), o!("zetta_version" => crate::VERSION)))
        })
    }

    /// Install a root logger as the global one. Can only succeed once per process.
    ///
    /// Returns `Err(())` if the global logger was already initialized, either by a
    /// prior call to `setup` or by an earlier call to `get`.
    pub fn setup(root_logger: &SlogLogger) -> Result<(), ()> {
        GLOBAL_LOGGER
            .set(GlobalLogger::new(root_logger.clone()))
            .map_err(|_| ())
    }
}
