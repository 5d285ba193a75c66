//! Error types for the Herald framework.

use std::any::Any;

use thiserror::Error;

use herald_core::{BoxError, ChannelError, DeliveryError, HistoryError, NotificationRecord};

/// Errors raised by the plugin registry and runner.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin with the same name is already registered.
    #[error("plugin '{name}' is already registered")]
    Duplicate {
        /// The conflicting plugin name.
        name: String,
    },

    /// No plugin is registered under the requested name.
    #[error("plugin '{name}' not found")]
    NotFound {
        /// The missing plugin name.
        name: String,
    },

    /// The plugin's initialize hook failed; the plugin was not registered.
    #[error("plugin '{name}' failed to initialize: {source}")]
    InitializeFailed {
        /// Plugin name.
        name: String,
        /// Error returned by the hook.
        source: BoxError,
    },

    /// The plugin's execute hook failed.
    #[error("plugin '{name}' execution failed: {source}")]
    ExecutionFailed {
        /// Plugin name.
        name: String,
        /// Error returned by the hook.
        source: BoxError,
    },
}

impl PluginError {
    /// Creates a duplicate registration error.
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::Duplicate { name: name.into() }
    }

    /// Creates a lookup miss error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}

/// Errors raised by direct sends through the
/// [`NotificationDispatcher`](crate::NotificationDispatcher).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The requested channel is not registered.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The channel failed to deliver. The failed record has been stored.
    #[error("delivery via '{}' failed: {source}", .record.channel())]
    Delivery {
        /// The stored, failed record.
        record: Box<NotificationRecord>,
        /// Error returned by the channel.
        source: DeliveryError,
    },

    /// The history store rejected the record.
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Result type for direct dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Extracts the message of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}
