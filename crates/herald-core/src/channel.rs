//! Delivery channels and the registry that owns them.
//!
//! A [`Channel`] is a named delivery mechanism (email, SMS, push…). Channels
//! are registered once under a unique name and are immutable afterwards; the
//! dispatcher resolves them by name at publish time.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{ChannelError, ChannelResult, DeliveryResult};
use crate::recipient::Recipient;

/// A delivery mechanism for formatted notification content.
///
/// Implementations pick the address they need from
/// [`Recipient::contact`] and report any failure as a
/// [`DeliveryError`](crate::DeliveryError). Failures are treated as transient
/// and retried by the dispatcher.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Delivers `content` to `recipient`.
    async fn deliver(&self, recipient: &Recipient, content: &str) -> DeliveryResult<()>;
}

/// Shared handle to a registered channel.
pub type BoxedChannel = Arc<dyn Channel>;

/// Registry of named channels.
///
/// All mutations go through a single write lock, so two concurrent
/// registrations of the same name cannot both succeed.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, BoxedChannel>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `channel` under `name`.
    ///
    /// Fails with [`ChannelError::Duplicate`] if the name is taken; the
    /// existing channel is kept.
    pub fn register<C>(&self, name: impl Into<String>, channel: C) -> ChannelResult<()>
    where
        C: Channel + 'static,
    {
        self.register_boxed(name, Arc::new(channel))
    }

    /// Registers an already shared channel under `name`.
    pub fn register_boxed(&self, name: impl Into<String>, channel: BoxedChannel) -> ChannelResult<()> {
        let name = name.into();
        match self.channels.write().entry(name) {
            Entry::Occupied(e) => Err(ChannelError::duplicate(e.key().clone())),
            Entry::Vacant(e) => {
                info!(channel = %e.key(), "Channel registered");
                e.insert(channel);
                Ok(())
            }
        }
    }

    /// Returns the channel registered under `name`.
    pub fn get(&self, name: &str) -> ChannelResult<BoxedChannel> {
        self.channels
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ChannelError::not_found(name))
    }

    /// Removes the channel registered under `name`.
    pub fn remove(&self, name: &str) -> ChannelResult<BoxedChannel> {
        let removed = self
            .channels
            .write()
            .remove(name)
            .ok_or_else(|| ChannelError::not_found(name))?;
        debug!(channel = %name, "Channel removed");
        Ok(removed)
    }

    /// Returns `true` if a channel is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.channels.read().contains_key(name)
    }

    /// Returns the registered names, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }

    /// Returns the number of registered channels.
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    /// Returns `true` if no channel is registered.
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.names())
            .finish()
    }
}
