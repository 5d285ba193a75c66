//! Plugin system for the Herald framework.
//!
//! # Architecture
//!
//! A plugin is any type implementing [`Plugin`]: a name, a version and three
//! lifecycle hooks.
//!
//! ```text
//! register()   ──► initialize()  ──► Registered   (rolled back if initialize fails)
//! execute_*()  ──► execute(ctx)       (per invocation)
//! unregister() ──► cleanup()     ──► removed      (removal wins even if cleanup fails)
//! ```
//!
//! - [`PluginRegistry`] owns the registered plugins in registration order.
//! - [`PluginRunner`] executes them against a shared [`PluginContext`],
//!   isolating the failure of any single plugin.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use herald_framework::prelude::*;
//!
//! struct Analytics;
//!
//! #[async_trait]
//! impl Plugin for Analytics {
//!     fn name(&self) -> &str { "analytics" }
//!     fn version(&self) -> &str { "1.0.0" }
//!     async fn initialize(&self) -> Result<(), BoxError> { Ok(()) }
//!     async fn execute(&self, ctx: &PluginContext) -> Result<(), BoxError> {
//!         ctx.logger().info(&format!("Tracking event: {}", ctx.data()["event"]));
//!         Ok(())
//!     }
//! }
//!
//! let registry = Arc::new(PluginRegistry::new());
//! registry.register(Analytics).await?;
//! let report = PluginRunner::new(registry).execute_all(&PluginContext::new(data)).await;
//! ```
//!
//! [`PluginContext`]: crate::PluginContext

pub mod core;
pub mod registry;
pub mod runner;

pub use self::core::{BoxedPlugin, Plugin, PluginInfo};
pub use registry::{PluginRegistry, UnregisterReport};
pub use runner::{ExecutionReport, PluginFailure, PluginRunner};
