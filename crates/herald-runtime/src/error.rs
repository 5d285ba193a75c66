//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use herald_core::{ChannelError, HistoryError};
use herald_framework::{DispatchError, PluginError};

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
