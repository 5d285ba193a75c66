//! Fault-isolated plugin execution.
//!
//! [`PluginRunner::execute_all`] runs every registered plugin sequentially, in
//! registration order, against one shared [`PluginContext`]. A plugin that
//! returns an error, or panics, is reported and skipped over; the remaining
//! plugins still run. [`PluginRunner::execute_one`] runs a single plugin and
//! hands its failure straight back to the caller.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::{Instrument, debug, error, info_span};

use super::registry::PluginRegistry;
use crate::context::PluginContext;
use crate::error::{PluginError, PluginResult, panic_message};
use herald_core::Outcome;

/// A plugin that failed during `execute_all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginFailure {
    pub name: String,
    pub error: String,
}

/// Aggregate result of [`PluginRunner::execute_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// Plugins whose `execute` returned `Ok`, in execution order.
    pub executed: Vec<String>,
    /// Plugins whose `execute` failed, in execution order.
    pub failures: Vec<PluginFailure>,
}

impl ExecutionReport {
    /// Total number of plugins run.
    pub fn total(&self) -> usize {
        self.executed.len() + self.failures.len()
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::classify(self.total(), self.failures.len())
    }
}

/// Executes the plugins of a [`PluginRegistry`].
#[derive(Clone)]
pub struct PluginRunner {
    registry: Arc<PluginRegistry>,
}

impl PluginRunner {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Runs every registered plugin against `ctx`.
    ///
    /// Never fails as a whole: each plugin's error or panic is logged through
    /// the context logger and collected into the report.
    pub async fn execute_all(&self, ctx: &PluginContext) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        // Held for the whole pass; concurrent unregistrations wait for it.
        let plugins = self.registry.read().await;
        for plugin in plugins.iter() {
            let name = plugin.name().to_string();
            let span = info_span!("execute", plugin = %name);

            let result = AssertUnwindSafe(plugin.execute(ctx))
                .catch_unwind()
                .instrument(span)
                .await;

            let message = match result {
                Ok(Ok(())) => {
                    debug!(plugin = %name, "Plugin executed");
                    report.executed.push(name);
                    continue;
                }
                Ok(Err(e)) => {
                    ctx.logger().error(
                        &format!("Plugin {name} execution failed"),
                        Some(e.as_ref() as &(dyn std::error::Error + 'static)),
                    );
                    e.to_string()
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    ctx.logger()
                        .error(&format!("Plugin {name} panicked: {message}"), None);
                    message
                }
            };

            error!(plugin = %name, error = %message, "Plugin execution failed; continuing");
            report.failures.push(PluginFailure {
                name,
                error: message,
            });
        }

        report
    }

    /// Runs the plugin registered under `name` against `ctx`.
    ///
    /// Fails with [`PluginError::NotFound`] if absent and with
    /// [`PluginError::ExecutionFailed`] if the plugin fails.
    pub async fn execute_one(&self, name: &str, ctx: &PluginContext) -> PluginResult<()> {
        let plugins = self.registry.read().await;
        let plugin = plugins
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| PluginError::not_found(name))?;

        plugin
            .execute(ctx)
            .instrument(info_span!("execute", plugin = %name))
            .await
            .map_err(|source| PluginError::ExecutionFailed {
                name: name.to_string(),
                source,
            })
    }
}
