//! Fire-and-forget progress logging.
//!
//! The orchestrator reports progress between algorithmic steps but never
//! blocks on the sink. The default sink forwards to the `log` facade.

use std::sync::Arc;

/// Sink for progress messages.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards progress messages to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdLogger;

impl Logger for StdLogger {
    fn log(&self, message: &str) {
        log::info!("{}", message);
    }
}

/// A progress logger bound to one pipeline operation.
///
/// Cheap to clone. When `silent` is set, or when no sink is attached, every
/// call is a no-op.
#[derive(Clone)]
pub struct ProgressLogger {
    logger: Option<Arc<dyn Logger>>,
    silent: bool,
}

impl ProgressLogger {
    pub fn new(logger: Option<Arc<dyn Logger>>, silent: bool) -> Self {
        Self { logger, silent }
    }

    /// A logger that discards everything.
    pub fn silent() -> Self {
        Self {
            logger: None,
            silent: true,
        }
    }

    /// The default logger backed by the `log` facade.
    pub fn stdout() -> Self {
        Self {
            logger: Some(Arc::new(StdLogger)),
            silent: false,
        }
    }

    pub fn log(&self, message: &str) {
        if self.silent {
            return;
        }
        if let Some(logger) = &self.logger {
            logger.log(message);
        }
    }

    pub fn progress(&self, percent: usize) {
        self.log(&format!("Progress: {}%.", percent));
    }
}

impl std::fmt::Debug for ProgressLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressLogger")
            .field("silent", &self.silent)
            .finish()
    }
}
