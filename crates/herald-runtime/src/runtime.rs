//! Runtime orchestration.
//!
//! [`HeraldRuntime`] owns the channel registry, the plugin registry, the
//! notification dispatcher and the event bus, and wires them to one loaded
//! [`HeraldConfig`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use herald_runtime::HeraldRuntime;
//!
//! // Loads herald.toml from the current directory, falling back to defaults
//! let runtime = HeraldRuntime::new();
//!
//! // Custom configuration and collaborators
//! let runtime = HeraldRuntime::builder()
//!     .config_file("config/herald.toml")
//!     .profile("production")
//!     .preferences(Arc::new(preferences))
//!     .build()?;
//!
//! runtime.register_channel("email", EmailChannel::new())?;
//! runtime.register_plugin(AnalyticsPlugin::default()).await?;
//! runtime.subscribe("order.created", "email")?;
//!
//! let report = runtime.publish(&event, &recipients).await;
//! runtime.shutdown().await;
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::{ConfigLoader, HeraldConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;
use herald_core::{
    Channel, ChannelRegistry, Event, HistoryStore, Logger, NotificationRecord, Outcome,
    PreferenceSource, Recipient, Sleeper, TracingLogger,
};
use herald_framework::{
    BusReport, EventBus, ExecutionReport, NotificationDispatcher, Plugin, PluginContext,
    PluginInfo, PluginRegistry, PluginRunner, PublishReport, UnregisterReport,
};

/// Combined result of [`HeraldRuntime::publish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeReport {
    pub event_type: String,
    pub plugins: ExecutionReport,
    pub bus: BusReport,
    pub notifications: PublishReport,
}

impl RuntimeReport {
    /// Overall outcome across plugins, bus handlers and deliveries.
    pub fn outcome(&self) -> Outcome {
        let bus_total = self.bus.handled + self.bus.errors.len();
        let total = self.plugins.total() + bus_total + self.notifications.deliveries.len();
        let failed =
            self.plugins.failures.len() + self.bus.errors.len() + self.notifications.failed();
        Outcome::classify(total, failed)
    }
}

/// Optional collaborators replacing the runtime defaults.
#[derive(Default)]
struct Components {
    preferences: Option<Arc<dyn PreferenceSource>>,
    history: Option<Arc<dyn HistoryStore>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    logger: Option<Arc<dyn Logger>>,
}

/// The Herald runtime.
pub struct HeraldRuntime {
    config: HeraldConfig,
    /// `plugins` section of the config, handed to every plugin context.
    plugin_config: Map<String, Value>,
    channels: Arc<ChannelRegistry>,
    runner: PluginRunner,
    dispatcher: NotificationDispatcher,
    bus: EventBus,
    logger: Arc<dyn Logger>,
}

impl HeraldRuntime {
    /// Creates a runtime from the configuration found in the default
    /// locations, falling back to defaults when it cannot be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new().load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config ({e}), using defaults");
            HeraldConfig::default()
        });
        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Installs the global log subscriber unless one already exists.
    pub fn from_config(config: &HeraldConfig) -> Self {
        Self::assemble(config.clone(), Components::default())
    }

    fn assemble(config: HeraldConfig, components: Components) -> Self {
        logging::init_from_config(&config.logging);

        let mut retry = config.notifications.retry_executor();
        if let Some(sleeper) = components.sleeper {
            retry = retry.with_sleeper(sleeper);
        }

        let channels = Arc::new(ChannelRegistry::new());
        let mut dispatcher = NotificationDispatcher::builder(Arc::clone(&channels))
            .retry(retry)
            .max_attempts(config.notifications.max_attempts);
        if let Some(preferences) = components.preferences {
            dispatcher = dispatcher.preferences(preferences);
        }
        if let Some(history) = components.history {
            dispatcher = dispatcher.history(history);
        }

        let plugin_config = config
            .plugins
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            max_attempts = config.notifications.max_attempts,
            "Runtime initialized from configuration"
        );

        Self {
            config,
            plugin_config,
            channels,
            runner: PluginRunner::new(Arc::new(PluginRegistry::new())),
            dispatcher: dispatcher.build(),
            bus: EventBus::new(),
            logger: components
                .logger
                .unwrap_or_else(|| Arc::new(TracingLogger::default())),
        }
    }

    pub fn config(&self) -> &HeraldConfig {
        &self.config
    }

    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.channels
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        self.runner.registry()
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// The event bus observers subscribe to.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // ─── Registration ────────────────────────────────────────────────────────

    pub fn register_channel<C>(&self, name: impl Into<String>, channel: C) -> RuntimeResult<()>
    where
        C: Channel + 'static,
    {
        Ok(self.channels.register(name, channel)?)
    }

    /// Registers and initializes `plugin`.
    pub async fn register_plugin<P>(&self, plugin: P) -> RuntimeResult<PluginInfo>
    where
        P: Plugin + 'static,
    {
        Ok(self.plugins().register(plugin).await?)
    }

    /// Unregisters the plugin named `name`, running its cleanup hook.
    pub async fn unregister_plugin(&self, name: &str) -> RuntimeResult<UnregisterReport> {
        Ok(self.plugins().unregister(name).await?)
    }

    /// Subscribes `channel` to `event_type`; `false` if already subscribed.
    pub fn subscribe(
        &self,
        event_type: impl Into<String>,
        channel: impl Into<String>,
    ) -> RuntimeResult<bool> {
        Ok(self.dispatcher.subscribe(event_type, channel)?)
    }

    pub fn unsubscribe(&self, event_type: &str, channel: &str) -> bool {
        self.dispatcher.unsubscribe(event_type, channel)
    }

    // ─── Publishing ──────────────────────────────────────────────────────────

    /// Runs every plugin, the bus handlers and the notification fan-out for
    /// `event`, in that order. Failures of any unit are reported, never raised.
    pub async fn publish(&self, event: &Event, recipients: &[Recipient]) -> RuntimeReport {
        let span = info_span!("publish", event_type = %event.event_type());
        async {
            let ctx = self.plugin_context(event);
            let plugins = self.runner.execute_all(&ctx).await;
            let bus = self.bus.publish(event).await;
            let notifications = self.dispatcher.publish(event, recipients).await;

            RuntimeReport {
                event_type: event.event_type().to_string(),
                plugins,
                bus,
                notifications,
            }
        }
        .instrument(span)
        .await
    }

    /// Runs the single plugin `name` for `event`, propagating its failure.
    pub async fn execute_plugin(&self, name: &str, event: &Event) -> RuntimeResult<()> {
        let ctx = self.plugin_context(event);
        Ok(self.runner.execute_one(name, &ctx).await?)
    }

    /// Delivers `content` once through `channel`, without retry.
    pub async fn send(
        &self,
        recipient: &Recipient,
        channel: &str,
        content: &str,
    ) -> RuntimeResult<NotificationRecord> {
        Ok(self.dispatcher.send(recipient, channel, content).await?)
    }

    /// Notification history of `recipient_id`, in insertion order.
    pub async fn history(&self, recipient_id: &str) -> RuntimeResult<Vec<NotificationRecord>> {
        Ok(self.dispatcher.get_history(recipient_id).await?)
    }

    /// Unregisters every plugin in reverse registration order.
    pub async fn shutdown(&self) -> Vec<UnregisterReport> {
        let mut reports = Vec::new();
        for info in self.plugins().list().await.into_iter().rev() {
            match self.plugins().unregister(&info.name).await {
                Ok(report) => reports.push(report),
                // Unregistered concurrently.
                Err(e) => debug!(plugin = %info.name, error = %e, "Skipping plugin on shutdown"),
            }
        }

        let warnings = reports.iter().filter(|r| r.cleanup_warning.is_some()).count();
        if warnings > 0 {
            warn!(warnings, "Runtime shut down with plugin cleanup warnings");
        } else {
            info!(plugins = reports.len(), "Runtime shut down");
        }
        reports
    }

    fn plugin_context(&self, event: &Event) -> PluginContext {
        let data = json!({
            "event": event.event_type(),
            "payload": event.payload(),
            "occurred_at": event.occurred_at().to_rfc3339(),
        });
        PluginContext::new(data)
            .with_config(self.plugin_config.clone())
            .with_logger(Arc::clone(&self.logger))
    }
}

impl Default for HeraldRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HeraldRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeraldRuntime")
            .field("config", &self.config)
            .field("channels", &self.channels)
            .field("dispatcher", &self.dispatcher)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`HeraldRuntime`].
pub struct RuntimeBuilder {
    loader: ConfigLoader,
    config: Option<HeraldConfig>,
    components: Components,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            config: None,
            components: Components::default(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.loader = self.loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Merges `config` on top of the loaded sources.
    pub fn merge(mut self, config: HeraldConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    /// Uses `config` as is instead of loading one.
    pub fn config(mut self, config: HeraldConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn preferences(mut self, preferences: Arc<dyn PreferenceSource>) -> Self {
        self.components.preferences = Some(preferences);
        self
    }

    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.components.history = Some(history);
        self
    }

    /// Replaces the timer used between delivery attempts.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.components.sleeper = Some(sleeper);
        self
    }

    /// Replaces the logger handed to plugins.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.components.logger = Some(logger);
        self
    }

    pub fn build(self) -> RuntimeResult<HeraldRuntime> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.loader.load()?,
        };
        Ok(HeraldRuntime::assemble(config, self.components))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
