//! # Herald Core
//!
//! Foundation types for the Herald notification and plugin framework.
//!
//! This crate holds everything the framework layer builds upon:
//!
//! - **Events**: immutable typed facts ([`Event`])
//! - **Recipients**: identities, contact addresses and channel preferences
//!   ([`Recipient`], [`RecipientPreference`], [`PreferenceSource`])
//! - **Channels**: named delivery mechanisms and their registry
//!   ([`Channel`], [`ChannelRegistry`])
//! - **History**: notification records and the append-only store
//!   ([`NotificationRecord`], [`HistoryStore`], [`InMemoryHistory`])
//! - **Retry**: exponential backoff around fallible operations ([`RetryExecutor`])
//! - **Logging**: the capability handed to plugins ([`Logger`], [`TracingLogger`])
//!
//! ## Delivery flow
//!
//! ```text
//! ┌───────┐     ┌────────────┐     ┌───────────────┐     ┌─────────┐
//! │ Event │────▶│ Dispatcher │────▶│ RetryExecutor │────▶│ Channel │
//! └───────┘     └────────────┘     └───────────────┘     └─────────┘
//!                     │
//!                     ▼
//!              ┌──────────────┐
//!              │ HistoryStore │
//!              └──────────────┘
//! ```

pub mod channel;
pub mod error;
pub mod event;
pub mod logger;
pub mod outcome;
pub mod recipient;
pub mod record;
pub mod retry;

pub use channel::{BoxedChannel, Channel, ChannelRegistry};
pub use error::{
    BoxError, ChannelError, ChannelResult, DeliveryError, DeliveryResult, HistoryError,
    HistoryResult,
};
pub use event::Event;
pub use logger::{Logger, TracingLogger};
pub use outcome::Outcome;
pub use recipient::{
    AllChannelsEnabled, InMemoryPreferences, PreferenceSource, Recipient, RecipientPreference,
};
pub use record::{HistoryStore, InMemoryHistory, NotificationRecord, NotificationStatus};
pub use retry::{RetryExecutor, Sleeper, TokioSleeper};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Channel, ChannelRegistry, DeliveryError, DeliveryResult, Event, Logger, Outcome,
        PreferenceSource, Recipient, RecipientPreference,
    };
}
