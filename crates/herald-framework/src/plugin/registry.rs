//! Plugin registration and lifecycle.
//!
//! [`PluginRegistry`] is the single owner of registered plugins. It:
//!
//! - Runs a plugin's `initialize` hook during [`register`](PluginRegistry::register)
//!   and only stores the plugin when the hook succeeds.
//! - Keeps plugins in registration order, the order the runner executes them in.
//! - Runs `cleanup` during [`unregister`](PluginRegistry::unregister) after the
//!   plugin has been removed; a cleanup failure comes back as a warning in
//!   the [`UnregisterReport`].
//!
//! Registration holds the write lock across `initialize`, so concurrent
//! registrations of one name are serialised and only the first can succeed.
//! Execution holds the read lock, so an unregistered plugin never runs after
//! its cleanup.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{error, info, warn};

use super::core::{BoxedPlugin, Plugin, PluginInfo};
use crate::error::{PluginError, PluginResult};

/// Result of a successful [`PluginRegistry::unregister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnregisterReport {
    /// The removed plugin.
    pub plugin: PluginInfo,
    /// Error message of a failed `cleanup` hook, if any.
    pub cleanup_warning: Option<String>,
}

/// Registry of named plugins, ordered by registration.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<Vec<BoxedPlugin>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin`.
    ///
    /// Fails with [`PluginError::Duplicate`] when the name is taken and with
    /// [`PluginError::InitializeFailed`] when `initialize` fails. In both cases
    /// the registry is left unchanged.
    pub async fn register<P>(&self, plugin: P) -> PluginResult<PluginInfo>
    where
        P: Plugin + 'static,
    {
        self.register_arc(Arc::new(plugin)).await
    }

    /// Registers an already shared plugin.
    pub async fn register_arc(&self, plugin: BoxedPlugin) -> PluginResult<PluginInfo> {
        let info = PluginInfo::of(plugin.as_ref());
        let mut plugins = self.plugins.write().await;

        if plugins.iter().any(|p| p.name() == info.name) {
            return Err(PluginError::duplicate(info.name));
        }

        if let Err(source) = plugin.initialize().await {
            error!(plugin = %info.name, error = %source, "Failed to initialize plugin");
            return Err(PluginError::InitializeFailed {
                name: info.name,
                source,
            });
        }

        plugins.push(plugin);
        info!(plugin = %info.name, version = %info.version, "Plugin registered");
        Ok(info)
    }

    /// Removes the plugin registered under `name` and runs its cleanup hook.
    ///
    /// Fails with [`PluginError::NotFound`] if absent. The plugin is removed
    /// before `cleanup` runs, so a failing cleanup never leaves it registered.
    pub async fn unregister(&self, name: &str) -> PluginResult<UnregisterReport> {
        let plugin = {
            let mut plugins = self.plugins.write().await;
            let pos = plugins
                .iter()
                .position(|p| p.name() == name)
                .ok_or_else(|| PluginError::not_found(name))?;
            plugins.remove(pos)
        };

        let cleanup_warning = match plugin.cleanup().await {
            Ok(()) => None,
            Err(e) => {
                warn!(plugin = %name, error = %e, "Plugin cleanup failed; plugin removed anyway");
                Some(e.to_string())
            }
        };

        info!(plugin = %name, "Plugin unregistered");
        Ok(UnregisterReport {
            plugin: PluginInfo::of(plugin.as_ref()),
            cleanup_warning,
        })
    }

    /// Returns the plugin registered under `name`.
    pub async fn get(&self, name: &str) -> Option<BoxedPlugin> {
        self.plugins
            .read()
            .await
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// Returns `true` if a plugin is registered under `name`.
    pub async fn contains(&self, name: &str) -> bool {
        self.plugins.read().await.iter().any(|p| p.name() == name)
    }

    /// Lists registered plugins in registration order.
    pub async fn list(&self) -> Vec<PluginInfo> {
        self.plugins
            .read()
            .await
            .iter()
            .map(|p| PluginInfo::of(p.as_ref()))
            .collect()
    }

    /// Returns the number of registered plugins.
    pub async fn len(&self) -> usize {
        self.plugins.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.plugins.read().await.is_empty()
    }

    /// Read access to the plugins, in registration order.
    ///
    /// `unregister` waits until the guard is dropped, so a plugin cannot be
    /// cleaned up while a holder of the guard may still execute it.
    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, Vec<BoxedPlugin>> {
        self.plugins.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PluginContext;
    use async_trait::async_trait;
    use herald_core::BoxError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Hooks {
        initialized: AtomicUsize,
        cleaned: AtomicUsize,
    }

    struct TestPlugin {
        name: &'static str,
        hooks: Arc<Hooks>,
        fail_init: bool,
        fail_cleanup: bool,
    }

    impl TestPlugin {
        fn new(name: &'static str, hooks: &Arc<Hooks>) -> Self {
            Self {
                name,
                hooks: Arc::clone(hooks),
                fail_init: false,
                fail_cleanup: false,
            }
        }
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        async fn initialize(&self) -> Result<(), BoxError> {
            tokio::task::yield_now().await;
            self.hooks.initialized.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                return Err("smtp unreachable".into());
            }
            Ok(())
        }

        async fn execute(&self, _ctx: &PluginContext) -> Result<(), BoxError> {
            Ok(())
        }

        async fn cleanup(&self) -> Result<(), BoxError> {
            self.hooks.cleaned.fetch_add(1, Ordering::SeqCst);
            if self.fail_cleanup {
                return Err("flush failed".into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn register_runs_initialize_once() {
        let hooks = Arc::new(Hooks::default());
        let registry = PluginRegistry::new();

        let info = registry.register(TestPlugin::new("logging", &hooks)).await.unwrap();

        assert_eq!(info.to_string(), "logging v1.0.0");
        assert_eq!(hooks.initialized.load(Ordering::SeqCst), 1);
        assert!(registry.contains("logging").await);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected_without_initialize() {
        let hooks = Arc::new(Hooks::default());
        let registry = PluginRegistry::new();
        registry.register(TestPlugin::new("logging", &hooks)).await.unwrap();

        let err = registry
            .register(TestPlugin::new("logging", &hooks))
            .await
            .unwrap_err();

        assert!(matches!(err, PluginError::Duplicate { name } if name == "logging"));
        assert_eq!(hooks.initialized.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn failed_initialize_rolls_back() {
        let hooks = Arc::new(Hooks::default());
        let registry = PluginRegistry::new();
        let mut plugin = TestPlugin::new("email", &hooks);
        plugin.fail_init = true;

        let err = registry.register(plugin).await.unwrap_err();

        assert!(matches!(err, PluginError::InitializeFailed { ref name, .. } if name == "email"));
        assert!(err.to_string().contains("smtp unreachable"));
        assert!(registry.is_empty().await);
        // The name is free again.
        registry.register(TestPlugin::new("email", &hooks)).await.unwrap();
    }

    #[tokio::test]
    async fn unregister_runs_cleanup_and_removes() {
        let hooks = Arc::new(Hooks::default());
        let registry = PluginRegistry::new();
        registry.register(TestPlugin::new("analytics", &hooks)).await.unwrap();

        let report = registry.unregister("analytics").await.unwrap();

        assert_eq!(report.plugin.name, "analytics");
        assert!(report.cleanup_warning.is_none());
        assert_eq!(hooks.cleaned.load(Ordering::SeqCst), 1);
        assert!(registry.get("analytics").await.is_none());
    }

    #[tokio::test]
    async fn failing_cleanup_still_removes() {
        let hooks = Arc::new(Hooks::default());
        let registry = PluginRegistry::new();
        let mut plugin = TestPlugin::new("email", &hooks);
        plugin.fail_cleanup = true;
        registry.register(plugin).await.unwrap();

        let report = registry.unregister("email").await.unwrap();

        assert_eq!(report.cleanup_warning.as_deref(), Some("flush failed"));
        assert!(!registry.contains("email").await);
    }

    #[tokio::test]
    async fn unregister_unknown_plugin_fails_without_side_effects() {
        let hooks = Arc::new(Hooks::default());
        let registry = PluginRegistry::new();
        registry.register(TestPlugin::new("logging", &hooks)).await.unwrap();

        let err = registry.unregister("missing").await.unwrap_err();

        assert!(matches!(err, PluginError::NotFound { name } if name == "missing"));
        assert_eq!(hooks.cleaned.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn list_keeps_registration_order() {
        let hooks = Arc::new(Hooks::default());
        let registry = PluginRegistry::new();
        for name in ["email-notification", "logging", "analytics"] {
            registry.register(TestPlugin::new(name, &hooks)).await.unwrap();
        }

        let names: Vec<_> = registry.list().await.into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["email-notification", "logging", "analytics"]);
    }

    #[tokio::test]
    async fn concurrent_duplicate_registrations_admit_one() {
        let hooks = Arc::new(Hooks::default());
        let registry = PluginRegistry::new();

        let results = futures::future::join_all(
            (0..5).map(|_| registry.register(TestPlugin::new("logging", &hooks))),
        )
        .await;

        let accepted = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(accepted, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, PluginError::Duplicate { .. })));
        assert_eq!(hooks.initialized.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len().await, 1);
    }
}
