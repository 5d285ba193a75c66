//! Notification dispatcher for the Herald framework.
//!
//! This module provides the [`NotificationDispatcher`], which maps event types
//! to subscribed channels and fans published events out to recipients.
//!
//! # Dispatch
//!
//! For every recipient of a [`publish`](NotificationDispatcher::publish) call:
//!
//! 1. The recipient's preferences are loaded; a channel is skipped only when
//!    it is explicitly disabled
//! 2. For each remaining subscribed channel a `pending` record is created
//! 3. The channel's `deliver` runs under the [`RetryExecutor`]
//! 4. The record is marked `sent` or `failed` and appended to history
//!
//! A failed delivery never aborts the call; the remaining (recipient, channel)
//! pairs are still processed.
//!
//! ```rust,ignore
//! use herald_framework::NotificationDispatcher;
//!
//! let channels = Arc::new(ChannelRegistry::new());
//! channels.register("email", EmailChannel)?;
//!
//! let dispatcher = NotificationDispatcher::builder(channels)
//!     .preferences(Arc::new(preferences))
//!     .max_attempts(3)
//!     .build();
//!
//! dispatcher.subscribe("order.created", "email")?;
//! let report = dispatcher.publish(&event, &recipients).await;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::{DispatchError, DispatchResult};
use herald_core::{
    AllChannelsEnabled, Channel, ChannelError, ChannelRegistry, ChannelResult, Event,
    HistoryResult, HistoryStore, InMemoryHistory, NotificationRecord, NotificationStatus, Outcome,
    PreferenceSource, Recipient, RecipientPreference, RetryExecutor,
};

/// Default number of delivery attempts per (recipient, channel) pair.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Renders an event into the content handed to channels.
pub type Formatter = Arc<dyn Fn(&Event) -> String + Send + Sync>;

// ─── Reports ──────────────────────────────────────────────────────────────────

/// Outcome of one (recipient, channel) delivery within a publish call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub record_id: Uuid,
    pub recipient_id: String,
    pub channel: String,
    pub status: NotificationStatus,
    pub attempts: u32,
    pub error: Option<String>,
}

impl From<&NotificationRecord> for DeliveryOutcome {
    fn from(record: &NotificationRecord) -> Self {
        Self {
            record_id: record.id(),
            recipient_id: record.recipient_id().to_string(),
            channel: record.channel().to_string(),
            status: record.status(),
            attempts: record.attempts(),
            error: record.error().map(str::to_string),
        }
    }
}

/// Aggregate result of [`NotificationDispatcher::publish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub event_type: String,
    /// One entry per attempted delivery, in dispatch order.
    pub deliveries: Vec<DeliveryOutcome>,
}

impl PublishReport {
    fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            deliveries: Vec::new(),
        }
    }

    /// Number of deliveries that ended `sent`.
    pub fn sent(&self) -> usize {
        self.count(NotificationStatus::Sent)
    }

    /// Number of deliveries that ended `failed`.
    pub fn failed(&self) -> usize {
        self.count(NotificationStatus::Failed)
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::classify(self.deliveries.len(), self.failed())
    }

    fn count(&self, status: NotificationStatus) -> usize {
        self.deliveries.iter().filter(|d| d.status == status).count()
    }
}

// ─── NotificationDispatcher ───────────────────────────────────────────────────

/// Routes events to subscribed channels with retry and history.
///
/// # Thread Safety
///
/// `NotificationDispatcher` is `Send + Sync`. Subscriptions sit behind a
/// `parking_lot` lock that is never held across an `.await`.
pub struct NotificationDispatcher {
    channels: Arc<ChannelRegistry>,
    /// event type → channel names, in subscription order.
    subscriptions: RwLock<HashMap<String, Vec<String>>>,
    preferences: Arc<dyn PreferenceSource>,
    history: Arc<dyn HistoryStore>,
    retry: RetryExecutor,
    max_attempts: u32,
    formatter: Formatter,
}

impl NotificationDispatcher {
    /// Creates a dispatcher with default collaborators: every channel enabled,
    /// in-memory history and the default retry policy.
    pub fn new(channels: Arc<ChannelRegistry>) -> Self {
        Self::builder(channels).build()
    }

    /// Starts building a dispatcher over `channels`.
    pub fn builder(channels: Arc<ChannelRegistry>) -> DispatcherBuilder {
        DispatcherBuilder::new(channels)
    }

    /// The channel registry this dispatcher resolves names against.
    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.channels
    }

    /// Subscribes `channel` to events of `event_type`.
    ///
    /// Returns `Ok(false)` if the pair was already subscribed. Fails with
    /// [`ChannelError::NotFound`] if `channel` is not registered.
    pub fn subscribe(
        &self,
        event_type: impl Into<String>,
        channel: impl Into<String>,
    ) -> ChannelResult<bool> {
        let event_type = event_type.into();
        let channel = channel.into();

        if !self.channels.contains(&channel) {
            return Err(ChannelError::not_found(channel));
        }

        let mut subscriptions = self.subscriptions.write();
        let subscribed = subscriptions.entry(event_type.clone()).or_default();
        if subscribed.contains(&channel) {
            return Ok(false);
        }

        debug!(event_type = %event_type, channel = %channel, "Channel subscribed");
        subscribed.push(channel);
        Ok(true)
    }

    /// Removes the subscription of `channel` to `event_type`.
    ///
    /// Returns `false` if there was nothing to remove.
    pub fn unsubscribe(&self, event_type: &str, channel: &str) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let Some(subscribed) = subscriptions.get_mut(event_type) else {
            return false;
        };

        let before = subscribed.len();
        subscribed.retain(|c| c != channel);
        let removed = subscribed.len() != before;

        if subscribed.is_empty() {
            subscriptions.remove(event_type);
        }
        if removed {
            debug!(event_type = %event_type, channel = %channel, "Channel unsubscribed");
        }
        removed
    }

    /// Channels subscribed to `event_type`, in subscription order.
    pub fn subscriptions(&self, event_type: &str) -> Vec<String> {
        self.subscriptions
            .read()
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Publishes `event` to `recipients` through every subscribed channel.
    ///
    /// Always completes: delivery failures end up as `failed` records in
    /// history and in the returned report.
    pub async fn publish(&self, event: &Event, recipients: &[Recipient]) -> PublishReport {
        let span = info_span!("dispatch", event_type = %event.event_type());
        self.publish_inner(event, recipients).instrument(span).await
    }

    async fn publish_inner(&self, event: &Event, recipients: &[Recipient]) -> PublishReport {
        let mut report = PublishReport::new(event.event_type());

        let channels = self.subscriptions(event.event_type());
        if channels.is_empty() {
            debug!("No channel subscribed; nothing to deliver");
            return report;
        }

        let content = (self.formatter)(event);

        for recipient in recipients {
            let preference = self.preferences_of(recipient).await;

            for channel in channels.iter().filter(|c| preference.is_enabled(c)) {
                let record = self.deliver_with_retry(recipient, channel, &content).await;
                report.deliveries.push(DeliveryOutcome::from(&record));
                self.store(record).await;
            }
        }

        info!(
            sent = report.sent(),
            failed = report.failed(),
            "Event published"
        );
        report
    }

    /// Returns the records of `recipient_id` in insertion order.
    pub async fn get_history(&self, recipient_id: &str) -> HistoryResult<Vec<NotificationRecord>> {
        self.history.for_recipient(recipient_id).await
    }

    /// Delivers `content` once through `channel`, without retry.
    ///
    /// The resulting record is stored either way. On failure it is also
    /// returned inside [`DispatchError::Delivery`].
    pub async fn send(
        &self,
        recipient: &Recipient,
        channel: &str,
        content: &str,
    ) -> DispatchResult<NotificationRecord> {
        let handle = self.channels.get(channel)?;
        let mut record = NotificationRecord::pending(recipient.id(), channel, content);

        let result = handle.deliver(recipient, content).await;
        match &result {
            Ok(()) => record.mark_sent(1),
            Err(e) => record.mark_failed(1, e.to_string()),
        };

        self.history.append(record.clone()).await?;

        match result {
            Ok(()) => Ok(record),
            Err(source) => Err(DispatchError::Delivery {
                record: Box::new(record),
                source,
            }),
        }
    }

    async fn preferences_of(&self, recipient: &Recipient) -> RecipientPreference {
        match self.preferences.preferences(recipient.id()).await {
            Ok(preference) => preference,
            Err(e) => {
                warn!(
                    recipient = %recipient.id(),
                    error = %e,
                    "Failed to load preferences; enabling all channels"
                );
                RecipientPreference::default()
            }
        }
    }

    async fn deliver_with_retry(
        &self,
        recipient: &Recipient,
        channel_name: &str,
        content: &str,
    ) -> NotificationRecord {
        let mut record = NotificationRecord::pending(recipient.id(), channel_name, content);

        let channel = match self.channels.get(channel_name) {
            Ok(channel) => channel,
            Err(e) => {
                // Subscribed, then removed from the registry.
                warn!(recipient = %recipient.id(), channel = %channel_name, "Subscribed channel is gone");
                record.mark_failed(0, e.to_string());
                return record;
            }
        };

        let channel: &dyn Channel = channel.as_ref();
        let (result, attempts) = self
            .retry
            .execute_counted(move || channel.deliver(recipient, content), self.max_attempts)
            .await;

        match result {
            Ok(()) => {
                record.mark_sent(attempts);
            }
            Err(e) => {
                error!(
                    recipient = %recipient.id(),
                    channel = %channel_name,
                    attempts,
                    error = %e,
                    "Notification failed"
                );
                record.mark_failed(attempts, e.to_string());
            }
        }
        record
    }

    async fn store(&self, record: NotificationRecord) {
        let id = record.id();
        if let Err(e) = self.history.append(record).await {
            error!(record = %id, error = %e, "Failed to append notification to history");
        }
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("channels", &self.channels)
            .field("subscriptions", &*self.subscriptions.read())
            .field("retry", &self.retry)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

// ─── DispatcherBuilder ────────────────────────────────────────────────────────

/// Builder for [`NotificationDispatcher`].
pub struct DispatcherBuilder {
    channels: Arc<ChannelRegistry>,
    preferences: Arc<dyn PreferenceSource>,
    history: Arc<dyn HistoryStore>,
    retry: RetryExecutor,
    max_attempts: u32,
    formatter: Formatter,
}

impl DispatcherBuilder {
    fn new(channels: Arc<ChannelRegistry>) -> Self {
        Self {
            channels,
            preferences: Arc::new(AllChannelsEnabled),
            history: Arc::new(InMemoryHistory::new()),
            retry: RetryExecutor::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            formatter: Arc::new(|event: &Event| event.to_string()),
        }
    }

    /// Sets where recipient preferences are read from.
    pub fn preferences(mut self, preferences: Arc<dyn PreferenceSource>) -> Self {
        self.preferences = preferences;
        self
    }

    /// Sets the store records are appended to.
    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = history;
        self
    }

    pub fn retry(mut self, retry: RetryExecutor) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the attempt count per delivery. Zero is treated as one.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Replaces the event → content formatter.
    pub fn formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Event) -> String + Send + Sync + 'static,
    {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn build(self) -> NotificationDispatcher {
        NotificationDispatcher {
            channels: self.channels,
            subscriptions: RwLock::new(HashMap::new()),
            preferences: self.preferences,
            history: self.history,
            retry: self.retry,
            max_attempts: self.max_attempts,
            formatter: self.formatter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::future::BoxFuture;
    use herald_core::{
        BoxError, DeliveryError, DeliveryResult, HistoryError, InMemoryPreferences, Sleeper,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSleeper {
        delays: parking_lot::Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
            self.delays.lock().push(duration);
            Box::pin(async {})
        }
    }

    /// Fails the first `failures` deliveries, then succeeds.
    struct MockChannel {
        calls: Arc<AtomicUsize>,
        failures: usize,
        contents: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    impl MockChannel {
        fn succeeding() -> Self {
            Self::failing(0)
        }

        fn failing(failures: usize) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                failures,
                contents: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl Channel for MockChannel {
        async fn deliver(&self, _recipient: &Recipient, content: &str) -> DeliveryResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.contents.lock().push(content.to_string());
            if n < self.failures {
                return Err(DeliveryError::Transport(format!("attempt {} refused", n + 1)));
            }
            Ok(())
        }
    }

    struct BrokenPreferences;

    #[async_trait]
    impl PreferenceSource for BrokenPreferences {
        async fn preferences(&self, _id: &str) -> Result<RecipientPreference, BoxError> {
            Err("preference service down".into())
        }
    }

    struct BrokenHistory;

    #[async_trait]
    impl HistoryStore for BrokenHistory {
        async fn append(&self, _record: NotificationRecord) -> HistoryResult<()> {
            Err(HistoryError::Unavailable("disk full".into()))
        }

        async fn for_recipient(&self, _id: &str) -> HistoryResult<Vec<NotificationRecord>> {
            Err(HistoryError::Unavailable("disk full".into()))
        }
    }

    fn builder(channels: &Arc<ChannelRegistry>, sleeper: &Arc<RecordingSleeper>) -> DispatcherBuilder {
        NotificationDispatcher::builder(Arc::clone(channels)).retry(
            RetryExecutor::new(Duration::from_millis(1000), Duration::from_secs(30))
                .with_sleeper(sleeper.clone()),
        )
    }

    fn order_created() -> Event {
        Event::new("order.created", json!({"orderId": "X1"}))
    }

    #[tokio::test]
    async fn publish_records_one_sent_notification_per_recipient() {
        let channels = Arc::new(ChannelRegistry::new());
        channels.register("email", MockChannel::succeeding()).unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = builder(&channels, &sleeper).build();
        dispatcher.subscribe("order.created", "email").unwrap();

        let recipients = [Recipient::new("u1"), Recipient::new("u2")];
        let report = dispatcher.publish(&order_created(), &recipients).await;

        assert_eq!(report.sent(), 2);
        assert_eq!(report.outcome(), Outcome::Success);
        for id in ["u1", "u2"] {
            let history = dispatcher.get_history(id).await.unwrap();
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].status(), NotificationStatus::Sent);
            assert_eq!(history[0].channel(), "email");
            assert_eq!(history[0].content(), r#"Event: order.created - {"orderId":"X1"}"#);
        }
        assert!(sleeper.delays.lock().is_empty());
    }

    #[tokio::test]
    async fn failing_channel_does_not_abort_publish() {
        let channels = Arc::new(ChannelRegistry::new());
        let sms = MockChannel::succeeding();
        let sms_calls = Arc::clone(&sms.calls);
        channels.register("email", MockChannel::failing(usize::MAX)).unwrap();
        channels.register("sms", sms).unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = builder(&channels, &sleeper).build();
        dispatcher.subscribe("order.created", "email").unwrap();
        dispatcher.subscribe("order.created", "sms").unwrap();

        let recipients = [Recipient::new("u1"), Recipient::new("u2")];
        let report = dispatcher.publish(&order_created(), &recipients).await;

        assert_eq!(report.failed(), 2);
        assert_eq!(report.sent(), 2);
        assert_eq!(report.outcome(), Outcome::PartialFailure);
        assert_eq!(sms_calls.load(Ordering::SeqCst), 2);

        let history = dispatcher.get_history("u1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status(), NotificationStatus::Failed);
        assert_eq!(history[0].attempts(), 3);
        assert_eq!(
            history[0].error(),
            Some("transport failure: attempt 3 refused")
        );
        assert_eq!(history[1].status(), NotificationStatus::Sent);
        assert!(history.iter().all(|r| r.status().is_terminal()));
        // Two backoffs per exhausted delivery, none after the last attempt.
        assert_eq!(sleeper.delays.lock().len(), 4);
    }

    #[tokio::test]
    async fn every_delivery_failing_still_records_each_pair() {
        let channels = Arc::new(ChannelRegistry::new());
        channels.register("email", MockChannel::failing(usize::MAX)).unwrap();
        channels.register("sms", MockChannel::failing(usize::MAX)).unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = builder(&channels, &sleeper).build();
        dispatcher.subscribe("order.created", "email").unwrap();
        dispatcher.subscribe("order.created", "sms").unwrap();

        let recipients = [Recipient::new("u1"), Recipient::new("u2"), Recipient::new("u3")];
        let report = dispatcher.publish(&order_created(), &recipients).await;

        assert_eq!(report.failed(), 6);
        assert_eq!(report.outcome(), Outcome::Failure);
        for id in ["u1", "u2", "u3"] {
            let history = dispatcher.get_history(id).await.unwrap();
            let names: Vec<_> = history.iter().map(|r| r.channel()).collect();
            assert_eq!(names, ["email", "sms"]);
            assert!(history
                .iter()
                .all(|r| r.status() == NotificationStatus::Failed && r.attempts() == 3));
        }
    }

    #[tokio::test]
    async fn transient_failure_is_retried_to_success() {
        let channels = Arc::new(ChannelRegistry::new());
        channels.register("push", MockChannel::failing(2)).unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = builder(&channels, &sleeper).build();
        dispatcher.subscribe("payment.completed", "push").unwrap();

        let event = Event::new("payment.completed", json!({"amount": 42}));
        let report = dispatcher.publish(&event, &[Recipient::new("u1")]).await;

        assert_eq!(report.deliveries[0].status, NotificationStatus::Sent);
        assert_eq!(report.deliveries[0].attempts, 3);
        assert_eq!(
            *sleeper.delays.lock(),
            [Duration::from_millis(2000), Duration::from_millis(4000)]
        );
    }

    #[tokio::test]
    async fn disabled_channel_is_skipped() {
        let channels = Arc::new(ChannelRegistry::new());
        let email = MockChannel::succeeding();
        let email_calls = Arc::clone(&email.calls);
        let sms = MockChannel::succeeding();
        let sms_calls = Arc::clone(&sms.calls);
        channels.register("email", email).unwrap();
        channels.register("sms", sms).unwrap();

        let preferences = Arc::new(InMemoryPreferences::new());
        preferences.set("u1", RecipientPreference::new().with("email", false));

        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = builder(&channels, &sleeper)
            .preferences(preferences)
            .build();
        dispatcher.subscribe("order.created", "email").unwrap();
        dispatcher.subscribe("order.created", "sms").unwrap();

        dispatcher
            .publish(&order_created(), &[Recipient::new("u1")])
            .await;

        assert_eq!(email_calls.load(Ordering::SeqCst), 0);
        assert_eq!(sms_calls.load(Ordering::SeqCst), 1);
        let history = dispatcher.get_history("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].channel(), "sms");
    }

    #[tokio::test]
    async fn preference_error_enables_all_channels() {
        let channels = Arc::new(ChannelRegistry::new());
        channels.register("email", MockChannel::succeeding()).unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = builder(&channels, &sleeper)
            .preferences(Arc::new(BrokenPreferences))
            .build();
        dispatcher.subscribe("order.created", "email").unwrap();

        let report = dispatcher
            .publish(&order_created(), &[Recipient::new("u1")])
            .await;
        assert_eq!(report.sent(), 1);
    }

    #[tokio::test]
    async fn duplicate_subscription_delivers_once() {
        let channels = Arc::new(ChannelRegistry::new());
        let email = MockChannel::succeeding();
        let calls = Arc::clone(&email.calls);
        channels.register("email", email).unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = builder(&channels, &sleeper).build();

        assert!(dispatcher.subscribe("order.created", "email").unwrap());
        assert!(!dispatcher.subscribe("order.created", "email").unwrap());
        assert_eq!(dispatcher.subscriptions("order.created"), ["email"]);

        dispatcher
            .publish(&order_created(), &[Recipient::new("u1")])
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_is_a_noop_for_unknown_pairs() {
        let channels = Arc::new(ChannelRegistry::new());
        let email = MockChannel::succeeding();
        let calls = Arc::clone(&email.calls);
        channels.register("email", email).unwrap();
        let dispatcher = NotificationDispatcher::new(channels);

        assert!(!dispatcher.unsubscribe("order.created", "email"));
        dispatcher.subscribe("order.created", "email").unwrap();
        assert!(!dispatcher.unsubscribe("order.created", "sms"));
        assert!(dispatcher.unsubscribe("order.created", "email"));

        let report = dispatcher
            .publish(&order_created(), &[Recipient::new("u1")])
            .await;
        assert!(report.deliveries.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscribe_to_unknown_channel_fails() {
        let dispatcher = NotificationDispatcher::new(Arc::new(ChannelRegistry::new()));
        let err = dispatcher.subscribe("order.created", "fax").unwrap_err();
        assert_eq!(err, ChannelError::not_found("fax"));
        assert!(dispatcher.subscriptions("order.created").is_empty());
    }

    #[tokio::test]
    async fn removed_channel_yields_failed_record() {
        let channels = Arc::new(ChannelRegistry::new());
        channels.register("sms", MockChannel::succeeding()).unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = builder(&channels, &sleeper).build();
        dispatcher.subscribe("order.created", "sms").unwrap();
        channels.remove("sms").unwrap();

        let report = dispatcher
            .publish(&order_created(), &[Recipient::new("u1")])
            .await;

        assert_eq!(report.outcome(), Outcome::Failure);
        assert_eq!(report.deliveries[0].attempts, 0);
        let history = dispatcher.get_history("u1").await.unwrap();
        assert_eq!(history[0].status(), NotificationStatus::Failed);
    }

    #[tokio::test]
    async fn custom_formatter_is_used() {
        let channels = Arc::new(ChannelRegistry::new());
        let email = MockChannel::succeeding();
        let contents = Arc::clone(&email.contents);
        channels.register("email", email).unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = builder(&channels, &sleeper)
            .formatter(|event| format!("[{}]", event.event_type()))
            .build();
        dispatcher.subscribe("order.created", "email").unwrap();

        dispatcher
            .publish(&order_created(), &[Recipient::new("u1")])
            .await;
        assert_eq!(*contents.lock(), ["[order.created]"]);
    }

    #[tokio::test]
    async fn history_failure_does_not_abort_publish() {
        let channels = Arc::new(ChannelRegistry::new());
        channels.register("email", MockChannel::succeeding()).unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = builder(&channels, &sleeper)
            .history(Arc::new(BrokenHistory))
            .build();
        dispatcher.subscribe("order.created", "email").unwrap();

        let recipients = [Recipient::new("u1"), Recipient::new("u2")];
        let report = dispatcher.publish(&order_created(), &recipients).await;
        assert_eq!(report.sent(), 2);
    }

    #[tokio::test]
    async fn send_delivers_once_and_stores_record() {
        let channels = Arc::new(ChannelRegistry::new());
        channels.register("email", MockChannel::succeeding()).unwrap();
        channels.register("sms", MockChannel::failing(usize::MAX)).unwrap();
        let dispatcher = NotificationDispatcher::new(Arc::clone(&channels));
        let recipient = Recipient::new("u1");

        let record = dispatcher.send(&recipient, "email", "hello").await.unwrap();
        assert_eq!(record.status(), NotificationStatus::Sent);

        let err = dispatcher.send(&recipient, "sms", "hello").await.unwrap_err();
        match err {
            DispatchError::Delivery { record, .. } => {
                assert_eq!(record.status(), NotificationStatus::Failed);
                assert_eq!(record.attempts(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = dispatcher.send(&recipient, "fax", "hello").await.unwrap_err();
        assert!(matches!(err, DispatchError::Channel(ChannelError::NotFound { .. })));

        assert_eq!(dispatcher.get_history("u1").await.unwrap().len(), 2);
    }
}
