//! Per-invocation context handed to plugins.
//!
//! A [`PluginContext`] bundles the data a plugin run operates on:
//!
//! - **data** - the payload of the invocation (usually an event rendered as JSON)
//! - **config** - a configuration mapping; the runtime fills it with the
//!   `plugins.<name>` sections of its config file, keyed by plugin name
//! - **logger** - the [`Logger`] plugins report through
//!
//! The caller of the runner builds one context per call and drops it after;
//! every plugin of an `execute_all` call sees the same context.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use herald_core::{Logger, TracingLogger};

/// Shared, read-only context for one plugin invocation.
#[derive(Clone)]
pub struct PluginContext {
    data: Value,
    config: Map<String, Value>,
    logger: Arc<dyn Logger>,
}

impl PluginContext {
    /// Creates a context with an empty config mapping and a tracing logger.
    pub fn new(data: Value) -> Self {
        Self {
            data,
            config: Map::new(),
            logger: Arc::new(TracingLogger::default()),
        }
    }

    /// Replaces the config mapping (builder pattern).
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Replaces the logger (builder pattern).
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// The invocation payload.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// The whole config mapping.
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// The logger plugins should report through.
    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    /// Deserialises the config entry under `key` into `T`.
    ///
    /// A missing entry is deserialised from an empty object, so structs with
    /// `#[serde(default)]` fall back to their defaults.
    pub fn get_config<T>(&self, key: &str) -> serde_json::Result<T>
    where
        T: DeserializeOwned,
    {
        match self.config.get(key) {
            Some(value) => T::deserialize(value),
            None => T::deserialize(&Value::Object(Map::new())),
        }
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("data", &self.data)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
