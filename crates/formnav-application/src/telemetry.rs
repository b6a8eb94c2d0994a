//! Tracing layer that captures navigation events for a live consumer.
//!
//! Every event that passes the subscriber's filter is flattened into a
//! [`NavigationEvent`] and pushed onto a tokio channel, so a request handler
//! or a test can observe what the engine logged.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

#[derive(Debug, Clone, serde::Serialize)]
pub struct NavigationEvent {
    /// Module path of the emitter, e.g. `formnav_core::navigation::dispatcher`
    pub target: String,
    pub level: String,
    pub message: String,
    pub fields: HashMap<String, Value>,
    /// RFC 3339
    pub timestamp: String,
}

pub struct NavigationEventLayer {
    sender: mpsc::UnboundedSender<NavigationEvent>,
}

impl NavigationEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<NavigationEvent>) -> Self {
        Self { sender }
    }

    /// A layer plus the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NavigationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl<S> Layer<S> for NavigationEventLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let message = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let navigation_event = NavigationEvent {
            target: event.metadata().target().to_string(),
            level: event.metadata().level().to_string(),
            message,
            fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Receiver gone means nobody is listening any more.
        let _ = self.sender.send(navigation_event);
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), Value::from(format!("{:?}", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_events_are_flattened() {
        let (layer, mut receiver) = NavigationEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(bucket = 7u64, key = "s-1", "Hash collision in lock table");
        });

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.level, "WARN");
        assert_eq!(event.message, "Hash collision in lock table");
        assert_eq!(event.fields["bucket"], 7);
        assert_eq!(event.fields["key"], "s-1");
        assert!(!event.fields.contains_key("message"));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (layer, receiver) = NavigationEventLayer::channel();
        drop(receiver);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Screen MenuScreen[menu] handling input 0");
        });
    }
}
