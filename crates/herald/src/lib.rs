//! # Herald
//!
//! Event-driven notification fan-out with a fault-isolated plugin system.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!                 ┌───▶│ PluginRunner │──▶ plugin "email-notification", "analytics", …
//!                 │    └──────────────┘
//! ┌─────────┐     │    ┌──────────────┐
//! │ Runtime │─────┼───▶│   EventBus   │──▶ observers
//! └─────────┘     │    └──────────────┘
//!                 │    ┌──────────────┐     ┌───────────────┐     ┌─────────┐
//!                 └───▶│  Dispatcher  │────▶│ RetryExecutor │────▶│ Channel │
//!                      └──────────────┘     └───────────────┘     └─────────┘
//! ```
//!
//! - **Channels**: named delivery mechanisms (email, SMS, push…)
//! - **Dispatcher**: maps event types to channels, honours recipient
//!   preferences, retries with backoff and records every outcome in history
//! - **Plugins**: extension units with `initialize`/`execute`/`cleanup` hooks;
//!   one failing plugin never stops the others
//! - **Runtime**: loads configuration, installs logging and drives all of the above
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HeraldRuntime::new();
//!     runtime.register_channel("email", EmailChannel)?;
//!     runtime.subscribe("order.created", "email")?;
//!
//!     let event = Event::new("order.created", json!({"orderId": "X1"}));
//!     let report = runtime.publish(&event, &[Recipient::new("u1")]).await;
//!     assert!(report.outcome().is_success());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use herald_core as core;
pub use herald_framework as framework;
pub use herald_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use herald::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use herald_runtime::{HeraldConfig, HeraldRuntime, RuntimeError, RuntimeReport};

    // Core values and channel capability
    pub use herald_core::{
        BoxError, Channel, DeliveryError, DeliveryResult, Event, InMemoryPreferences, Outcome,
        Recipient, RecipientPreference,
    };

    // Plugin system
    pub use herald_framework::{Plugin, PluginContext};

    pub use async_trait::async_trait;
    pub use serde_json::json;
    pub use std::sync::Arc;
}
