//! Recipients and their per-channel preferences.
//!
//! - [`Recipient`] - identity plus the per-channel contact addresses channels
//!   deliver to (email address, phone number, device token…).
//! - [`RecipientPreference`] - channel name → enabled flag for one recipient.
//!   Channels absent from the map are enabled.
//! - [`PreferenceSource`] - where the dispatcher reads preferences from.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::BoxError;

// =============================================================================
// Recipient
// =============================================================================

/// A notification recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    id: String,
    #[serde(default)]
    contacts: HashMap<String, String>,
}

impl Recipient {
    /// Creates a recipient with no contact addresses.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            contacts: HashMap::new(),
        }
    }

    /// Adds the address used by `channel` (builder pattern).
    pub fn with_contact(mut self, channel: impl Into<String>, address: impl Into<String>) -> Self {
        self.contacts.insert(channel.into(), address.into());
        self
    }

    /// The recipient id history is keyed by.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the address registered for `channel`, if any.
    pub fn contact(&self, channel: &str) -> Option<&str> {
        self.contacts.get(channel).map(String::as_str)
    }
}

// =============================================================================
// RecipientPreference
// =============================================================================

/// Channel enablement for a single recipient.
///
/// Only an explicit `false` disables a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientPreference {
    channels: HashMap<String, bool>,
}

impl RecipientPreference {
    /// Creates an empty preference set (everything enabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag for `channel` (builder pattern).
    pub fn with(mut self, channel: impl Into<String>, enabled: bool) -> Self {
        self.channels.insert(channel.into(), enabled);
        self
    }

    /// Sets the flag for `channel`.
    pub fn set(&mut self, channel: impl Into<String>, enabled: bool) {
        self.channels.insert(channel.into(), enabled);
    }

    /// Returns `false` only when `channel` is explicitly disabled.
    pub fn is_enabled(&self, channel: &str) -> bool {
        self.channels.get(channel).copied().unwrap_or(true)
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for RecipientPreference {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self {
            channels: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// =============================================================================
// PreferenceSource
// =============================================================================

/// Supplies recipient preferences to the dispatcher.
///
/// Returning an error is equivalent to returning an empty preference set:
/// the dispatcher logs it and treats every channel as enabled.
#[async_trait]
pub trait PreferenceSource: Send + Sync {
    /// Loads the preferences of `recipient_id`.
    async fn preferences(&self, recipient_id: &str) -> Result<RecipientPreference, BoxError>;
}

/// A source under which every channel is enabled for everybody.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllChannelsEnabled;

#[async_trait]
impl PreferenceSource for AllChannelsEnabled {
    async fn preferences(&self, _recipient_id: &str) -> Result<RecipientPreference, BoxError> {
        Ok(RecipientPreference::default())
    }
}

/// In-memory preference table keyed by recipient id.
#[derive(Debug, Default)]
pub struct InMemoryPreferences {
    table: RwLock<HashMap<String, RecipientPreference>>,
}

impl InMemoryPreferences {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the preferences of `recipient_id`.
    pub fn set(&self, recipient_id: impl Into<String>, preference: RecipientPreference) {
        self.table.write().insert(recipient_id.into(), preference);
    }

    /// Drops the preferences of `recipient_id`, re-enabling every channel.
    pub fn remove(&self, recipient_id: &str) -> Option<RecipientPreference> {
        self.table.write().remove(recipient_id)
    }
}

#[async_trait]
impl PreferenceSource for InMemoryPreferences {
    async fn preferences(&self, recipient_id: &str) -> Result<RecipientPreference, BoxError> {
        Ok(self
            .table
            .read()
            .get(recipient_id)
            .cloned()
            .unwrap_or_default())
    }
}
