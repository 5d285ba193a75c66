//! Order Notifications Example
//!
//! Publishes a few order events through the Herald runtime:
//!
//! - three console channels (`email`, `sms`, `push`); `push` fails for
//!   recipients without a device token and is retried before giving up
//! - three plugins (`email-notification`, `logging`, `analytics`)
//! - per-recipient preferences (`bob` has turned email off)
//!
//! # Usage
//!
//! ```bash
//! cargo run --package order-notifications -- --config demos/order-notifications/herald.toml
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use clap::Parser;
use herald::prelude::*;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(about = "Publish sample order events through Herald")]
struct Args {
    /// Configuration file; searched for in the current directory if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event type to publish besides `order.created`.
    #[arg(long, default_value = "payment.completed")]
    extra_event: String,
}

// ============================================================================
// Channels
// ============================================================================

/// Prints deliveries to stdout, addressed through one contact kind.
struct ConsoleChannel {
    kind: &'static str,
}

#[async_trait]
impl Channel for ConsoleChannel {
    async fn deliver(&self, recipient: &Recipient, content: &str) -> DeliveryResult<()> {
        let address = recipient
            .contact(self.kind)
            .ok_or_else(|| DeliveryError::missing_address(self.kind))?;
        println!("[{}] to {address}: {content}", self.kind.to_uppercase());
        Ok(())
    }
}

// ============================================================================
// Plugins
// ============================================================================

#[derive(serde::Deserialize)]
struct EmailSettings {
    #[serde(default = "default_sender")]
    from: String,
}

fn default_sender() -> String {
    "noreply@localhost".to_string()
}

struct EmailNotificationPlugin;

#[async_trait]
impl Plugin for EmailNotificationPlugin {
    fn name(&self) -> &str {
        "email-notification"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn initialize(&self) -> Result<(), BoxError> {
        info!("Email notification plugin initialized");
        Ok(())
    }

    async fn execute(&self, ctx: &PluginContext) -> Result<(), BoxError> {
        if ctx.data()["event"] != "order.created" {
            return Ok(());
        }
        let settings: EmailSettings = ctx.get_config(self.name())?;
        let order_id = ctx.data()["payload"]["orderId"]
            .as_str()
            .ok_or("order event without orderId")?;
        ctx.logger().info(&format!(
            "Sending order confirmation for {order_id} from {}",
            settings.from
        ));
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), BoxError> {
        info!("Email notification plugin cleaned up");
        Ok(())
    }
}

struct LoggingPlugin;

#[async_trait]
impl Plugin for LoggingPlugin {
    fn name(&self) -> &str {
        "logging"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn initialize(&self) -> Result<(), BoxError> {
        Ok(())
    }

    async fn execute(&self, ctx: &PluginContext) -> Result<(), BoxError> {
        ctx.logger()
            .info(&format!("Event occurred: {}", ctx.data()["event"]));
        ctx.logger().info(&format!("Data: {}", ctx.data()));
        Ok(())
    }
}

/// Counts tracked events; refuses events without a payload.
#[derive(Default)]
struct AnalyticsPlugin {
    tracked: AtomicUsize,
}

#[async_trait]
impl Plugin for AnalyticsPlugin {
    fn name(&self) -> &str {
        "analytics"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn initialize(&self) -> Result<(), BoxError> {
        Ok(())
    }

    async fn execute(&self, ctx: &PluginContext) -> Result<(), BoxError> {
        if ctx.data()["payload"].is_null() {
            return Err("cannot track an event without payload".into());
        }
        let n = self.tracked.fetch_add(1, Ordering::Relaxed) + 1;
        ctx.logger()
            .info(&format!("Tracking event {}: {}", n, ctx.data()["event"]));
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), BoxError> {
        info!(
            tracked = self.tracked.load(Ordering::Relaxed),
            "Analytics flushed"
        );
        Ok(())
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let preferences = Arc::new(InMemoryPreferences::new());
    preferences.set("bob", RecipientPreference::new().with("email", false));

    let mut builder = HeraldRuntime::builder().preferences(preferences);
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    let runtime = builder.build()?;

    for kind in ["email", "sms", "push"] {
        runtime.register_channel(kind, ConsoleChannel { kind })?;
    }

    runtime.register_plugin(EmailNotificationPlugin).await?;
    runtime.register_plugin(LoggingPlugin).await?;
    runtime.register_plugin(AnalyticsPlugin::default()).await?;

    runtime.subscribe("order.created", "email")?;
    runtime.subscribe("order.created", "sms")?;
    runtime.subscribe(args.extra_event.as_str(), "push")?;

    runtime.bus().subscribe("order.created", |event: Event| async move {
        info!(order = %event.payload()["orderId"], "Audit trail updated");
        Ok(())
    });

    let recipients = [
        Recipient::new("alice")
            .with_contact("email", "alice@example.com")
            .with_contact("sms", "+15550100")
            .with_contact("push", "device-token-a1"),
        Recipient::new("bob")
            .with_contact("email", "bob@example.com")
            .with_contact("sms", "+15550101"),
    ];

    let events = [
        Event::new("order.created", json!({"orderId": "12345", "total": 42.5})),
        Event::new(args.extra_event.as_str(), json!({"orderId": "12345"})),
        Event::new("order.created", serde_json::Value::Null),
    ];

    for event in &events {
        let report = runtime.publish(event, &recipients).await;
        match report.outcome() {
            Outcome::Success => info!(event = %event.event_type(), "Published"),
            outcome => warn!(
                event = %event.event_type(),
                ?outcome,
                failed_plugins = report.plugins.failures.len(),
                failed_deliveries = report.notifications.failed(),
                "Published with failures"
            ),
        }
    }

    for recipient in &recipients {
        for record in runtime.history(recipient.id()).await? {
            println!(
                "{:<6} {:<6} {:<7} attempts={} {}",
                record.recipient_id(),
                record.channel(),
                record.status(),
                record.attempts(),
                record.error().unwrap_or("")
            );
        }
    }

    for report in runtime.shutdown().await {
        if let Some(warning) = report.cleanup_warning {
            warn!(plugin = %report.plugin, %warning, "Cleanup failed");
        }
    }
    Ok(())
}
