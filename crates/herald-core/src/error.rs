//! Unified error types for the Herald core.
//!
//! This module provides the error taxonomy shared across core components.
//! Plugin errors live in herald-framework, configuration errors in herald-runtime.

use thiserror::Error;

/// Boxed, thread-safe error used for opaque failures raised by user code
/// (plugin hooks, preference sources, event bus handlers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Channel Errors
// =============================================================================

/// Errors raised by the [`ChannelRegistry`](crate::ChannelRegistry).
///
/// Both variants are caller errors: they are never retried and leave the
/// registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A channel with the same name is already registered.
    #[error("channel '{name}' is already registered")]
    Duplicate {
        /// The conflicting channel name.
        name: String,
    },

    /// No channel is registered under the requested name.
    #[error("channel '{name}' not found")]
    NotFound {
        /// The missing channel name.
        name: String,
    },
}

impl ChannelError {
    /// Creates a duplicate registration error.
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::Duplicate { name: name.into() }
    }

    /// Creates a lookup miss error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}

// =============================================================================
// Delivery Errors
// =============================================================================

/// Errors a [`Channel`](crate::Channel) reports when a delivery fails.
///
/// Delivery failures are transient by assumption; the dispatcher retries them
/// before recording the notification as failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The recipient has no address (email, phone, device token…) for the channel.
    #[error("recipient has no address for channel '{channel}'")]
    MissingAddress {
        /// Channel that needed the address.
        channel: String,
    },

    /// The downstream provider refused the message.
    #[error("delivery rejected: {reason}")]
    Rejected {
        /// Provider supplied reason.
        reason: String,
    },

    /// The transport failed before the provider acknowledged the message.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl DeliveryError {
    /// Creates a missing address error.
    pub fn missing_address(channel: impl Into<String>) -> Self {
        Self::MissingAddress {
            channel: channel.into(),
        }
    }

    /// Creates a rejection error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// History Errors
// =============================================================================

/// Errors raised by a [`HistoryStore`](crate::HistoryStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// The backing store could not be reached.
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for channel registry operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Result type for a single delivery.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Result type for history store operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
