//! Fire-and-forget logging capability handed to plugins.
//!
//! Plugins receive an `Arc<dyn Logger>` inside their context instead of a
//! global subscriber handle, so hosts can redirect or capture plugin output.
//! [`TracingLogger`] forwards everything to `tracing` under the
//! `herald::plugin` target.

use std::error::Error;

use tracing::{error, info};

/// Logging capability used by plugins and the dispatcher.
pub trait Logger: Send + Sync {
    /// Logs an informational message.
    fn info(&self, message: &str);

    /// Logs an error message with an optional cause.
    fn error(&self, message: &str, cause: Option<&(dyn Error + 'static)>);
}

/// [`Logger`] that emits `tracing` events tagged with a source name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    source: String,
}

impl TracingLogger {
    /// Creates a logger whose events carry `source = <source>`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("herald")
    }
}

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        info!(target: "herald::plugin", source = %self.source, "{message}");
    }

    fn error(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        match cause {
            Some(cause) => {
                error!(target: "herald::plugin", source = %self.source, error = %cause, "{message}")
            }
            None => error!(target: "herald::plugin", source = %self.source, "{message}"),
        }
    }
}
