//! In-process event bus for observers.
//!
//! The [`EventBus`] lets any number of async handlers observe events of a given
//! type without going through channels. Handlers for one event type run
//! sequentially, in subscription order; a failing or panicking handler is
//! logged and the next one still runs.
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! bus.subscribe("order.created", |event: Event| async move {
//!     println!("observed {}", event.event_type());
//!     Ok(())
//! });
//! bus.publish(&event).await;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::panic_message;
use herald_core::{BoxError, Event, Outcome};

/// A type-erased bus handler.
pub type BusHandler = Arc<dyn Fn(Event) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Result of [`EventBus::publish`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusReport {
    /// Number of handlers that completed successfully.
    pub handled: usize,
    /// Error messages of failed handlers, in call order.
    pub errors: Vec<String>,
}

impl BusReport {
    pub fn outcome(&self) -> Outcome {
        Outcome::classify(self.handled + self.errors.len(), self.errors.len())
    }
}

/// Event type keyed registry of async handlers.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<BusHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `handler` for events of `event_type`.
    pub fn subscribe<F, Fut>(&self, event_type: impl Into<String>, handler: F)
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let handler: BusHandler = Arc::new(move |event| handler(event).boxed());
        self.handlers
            .write()
            .entry(event_type.into())
            .or_default()
            .push(handler);
    }

    /// Drops every handler for `event_type`, returning how many were removed.
    pub fn clear(&self, event_type: &str) -> usize {
        self.handlers
            .write()
            .remove(event_type)
            .map_or(0, |handlers| handlers.len())
    }

    /// Number of handlers subscribed to `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.read().get(event_type).map_or(0, Vec::len)
    }

    /// Runs every handler subscribed to the event's type.
    ///
    /// Handler errors and panics are collected into the report.
    pub async fn publish(&self, event: &Event) -> BusReport {
        let handlers = self
            .handlers
            .read()
            .get(event.event_type())
            .cloned()
            .unwrap_or_default();

        let mut report = BusReport::default();
        for handler in handlers {
            // Constructing the future runs handler code too.
            let result = match catch_unwind(AssertUnwindSafe(|| handler(event.clone()))) {
                Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
                Err(panic) => Err(panic),
            };

            let message = match result {
                Ok(Ok(())) => {
                    report.handled += 1;
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
            };
            warn!(event_type = %event.event_type(), error = %message, "Event handler failed");
            report.errors.push(message);
        }

        debug!(
            event_type = %event.event_type(),
            handled = report.handled,
            failed = report.errors.len(),
            "Event bus dispatch complete"
        );
        report
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<String, usize> = self
            .handlers
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn handlers_run_in_order_and_failures_are_isolated() {
        let bus = EventBus::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let seen = Arc::clone(&order);
        bus.subscribe("order.created", move |_event| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push("first");
                Err::<(), BoxError>("observer offline".into())
            }
        });
        let seen = Arc::clone(&order);
        bus.subscribe("order.created", move |event: Event| {
            let seen = Arc::clone(&seen);
            async move {
                assert_eq!(event.payload()["orderId"], "X1");
                seen.lock().push("second");
                Ok(())
            }
        });

        let report = bus
            .publish(&Event::new("order.created", json!({"orderId": "X1"})))
            .await;

        assert_eq!(*order.lock(), ["first", "second"]);
        assert_eq!(report.handled, 1);
        assert_eq!(report.errors, ["observer offline"]);
        assert_eq!(report.outcome(), Outcome::PartialFailure);
    }

    #[tokio::test]
    async fn other_event_types_are_ignored() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bus.subscribe("payment.completed", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        let report = bus.publish(&Event::new("order.created", json!({}))).await;

        assert_eq!(report, BusReport::default());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(bus.handler_count("payment.completed"), 1);
        assert_eq!(bus.clear("payment.completed"), 1);
        assert_eq!(bus.handler_count("payment.completed"), 0);
    }

    #[tokio::test]
    async fn panicking_handler_is_isolated() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        bus.subscribe("order.created", |_| async {
            panic!("audit log corrupted");
        });
        let counter = Arc::clone(&calls);
        bus.subscribe("order.created", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        let report = bus.publish(&Event::new("order.created", json!({}))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.handled, 1);
        assert_eq!(report.errors, ["handler panicked: audit log corrupted"]);
    }
}
