//! # Herald Framework
//!
//! High-level components built on the core types:
//!
//! - **Plugins**: registration with lifecycle hooks and fault-isolated
//!   execution ([`PluginRegistry`], [`PluginRunner`])
//! - **Notifications**: subscriptions, preference filtering, retrying fan-out
//!   and history ([`NotificationDispatcher`])
//! - **Event bus**: in-process async observers keyed by event type ([`EventBus`])
//!
//! The plugin side and the notification side are independent; the runtime
//! layer wires them together behind a single `publish` call.

pub mod bus;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod plugin;

pub use bus::{BusHandler, BusReport, EventBus};
pub use context::PluginContext;
pub use dispatcher::{
    DEFAULT_MAX_ATTEMPTS, DeliveryOutcome, DispatcherBuilder, Formatter, NotificationDispatcher,
    PublishReport,
};
pub use error::{DispatchError, DispatchResult, PluginError, PluginResult};
pub use plugin::{
    BoxedPlugin, ExecutionReport, Plugin, PluginFailure, PluginInfo, PluginRegistry,
    PluginRunner, UnregisterReport,
};

/// Prelude for writing plugins and channels.
pub mod prelude {
    pub use std::sync::Arc;

    pub use async_trait::async_trait;
    pub use herald_core::prelude::*;
    pub use herald_core::BoxError;

    pub use crate::{
        EventBus, NotificationDispatcher, Plugin, PluginContext, PluginRegistry, PluginRunner,
    };
}
