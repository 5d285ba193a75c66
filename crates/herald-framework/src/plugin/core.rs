use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::PluginContext;
use herald_core::BoxError;

// ─── Plugin ───────────────────────────────────────────────────────────────────

/// An extension unit with lifecycle hooks.
///
/// # Concurrency
///
/// Plugins are shared as `Arc<dyn Plugin>` and hooks take `&self`. Use
/// interior mutability (e.g. `Mutex<T>` or atomics) for state that changes
/// across invocations.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique name within a registry.
    fn name(&self) -> &str;

    /// Version string, reported in logs and listings.
    fn version(&self) -> &str;

    /// Runs once during registration.
    ///
    /// Returning `Err` aborts the registration; the plugin is not added.
    async fn initialize(&self) -> Result<(), BoxError>;

    /// Runs for every invocation with the caller's context.
    async fn execute(&self, ctx: &PluginContext) -> Result<(), BoxError>;

    /// Runs once when the plugin is unregistered. Does nothing by default.
    ///
    /// A failure is reported to the caller as a warning; the plugin is
    /// removed regardless.
    async fn cleanup(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Shared handle to a registered plugin.
pub type BoxedPlugin = Arc<dyn Plugin>;

// ─── PluginInfo ───────────────────────────────────────────────────────────────

/// Name and version of a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
}

impl PluginInfo {
    pub(crate) fn of(plugin: &dyn Plugin) -> Self {
        Self {
            name: plugin.name().to_string(),
            version: plugin.version().to_string(),
        }
    }
}

impl std::fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}
