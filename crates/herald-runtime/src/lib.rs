//! Herald Runtime - orchestration layer for the Herald framework.
//!
//! This crate provides:
//! - Layered configuration loading and validation (`config`)
//! - Logging setup driven by that configuration (`logging`)
//! - The [`HeraldRuntime`], which owns the channel and plugin registries, the
//!   notification dispatcher and the event bus
//!
//! ```ignore
//! use herald_runtime::HeraldRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HeraldRuntime::builder().config_file("herald.toml").build()?;
//!
//!     runtime.register_channel("email", EmailChannel::default())?;
//!     runtime.register_plugin(AnalyticsPlugin::default()).await?;
//!     runtime.subscribe("order.created", "email")?;
//!
//!     let report = runtime.publish(&event, &recipients).await;
//!     println!("{:?}", report.outcome());
//!
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, HeraldConfig, NotificationConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{HeraldRuntime, RuntimeBuilder, RuntimeReport};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
