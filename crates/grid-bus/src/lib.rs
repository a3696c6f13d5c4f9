// crates/grid-bus/src/lib.rs
// ============================================================================
// Crate: grid-bus
// Description: In-process topic-keyed publish/subscribe event bus (C2).
// Purpose: Decouple publishers (the facade, zone engines, the guardian,
//          the monitoring loop) from the consumers that observe their
//          output (the external service shell's subscription surface,
//          the audit log, test harnesses).
// Dependencies: tokio (sync), serde_json
// ============================================================================

//! ## Overview
//! [`EventBus`] is a `HashMap<channel, subscriber list>` guarded by one
//! mutex, mirroring the single-mutex-around-the-registry pattern this
//! workspace uses everywhere a map of live handles needs thread safety
//! (C4's registry, C6's dispatcher). Each subscriber owns a bounded
//! `tokio::mpsc` channel; a publish that finds a subscriber's queue full
//! drops that one message for that one subscriber and continues — slow
//! consumers degrade gracefully instead of stalling publishers. The drop is
//! counted on the subscriber (queryable via [`Subscription::dropped_count`])
//! and recorded through [`Metrics`] (spec.md §4.2's "a warning is emitted" —
//! this workspace's logging is audit entries plus metric counters, not
//! println/tracing macros, per SPEC_FULL.md §B).
//!
//! # Invariants
//! - Subscribe/unsubscribe are serialized against each other by the
//!   registry mutex, but never against a publish: `publish` takes a
//!   snapshot of the current subscriber list (a cloned `Vec` of senders)
//!   and releases the mutex before sending (spec.md §4.2).
//! - A `serde_json::Value::Object` message without a `timestamp` field
//!   gets one attached automatically before it reaches any subscriber.

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use grid_core::telemetry::MetricEvent;
use grid_core::telemetry::Metrics;
use grid_core::telemetry::NoopMetrics;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Bounded per-subscriber queue depth (spec.md §4.2).
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 100;

/// Channels every deployment is expected to carry (spec.md §4.2, §4.12).
pub const REQUIRED_CHANNELS: &[&str] = &["grid_state", "agent_log", "guardian_event"];

/// Errors reported by the event bus.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BusError {
    /// The message could not be serialized to JSON for publication.
    #[error("failed to serialize bus message: {0}")]
    Serialization(String),
}

/// A handle returned from [`EventBus::subscribe`]; yields JSON messages
/// published on the subscribed channel until dropped.
pub struct Subscription {
    stream: ReceiverStream<Value>,
    dropped: Arc<AtomicUsize>,
}

impl Subscription {
    /// Awaits the next message on this subscription, or `None` once the
    /// bus drops every sender for this channel (never happens in
    /// practice, since the bus itself owns the registry for its
    /// lifetime; present for a clean shutdown path).
    pub async fn recv(&mut self) -> Option<Value> {
        use tokio_stream::StreamExt;
        self.stream.next().await
    }

    /// Number of messages dropped for this subscriber because its queue
    /// was full at publish time (spec.md §8's "the subscriber's dropped
    /// count rises").
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

struct Subscriber {
    sender: mpsc::Sender<Value>,
    dropped: Arc<AtomicUsize>,
}

/// In-process topic-keyed publish/subscribe bus.
pub struct EventBus {
    channels: Mutex<HashMap<String, Vec<Subscriber>>>,
    metrics: Arc<dyn Metrics>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Builds an empty bus with a no-op metrics sink. Channels come into
    /// existence on first `subscribe` or `publish`; [`REQUIRED_CHANNELS`]
    /// is a naming convention, not a pre-registration requirement.
    #[must_use]
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(NoopMetrics))
    }

    /// Builds an empty bus that records dropped-message counters (and
    /// anything else future callers add) through `metrics`.
    #[must_use]
    pub fn with_metrics(metrics: Arc<dyn Metrics>) -> Self {
        Self { channels: Mutex::new(HashMap::new()), metrics }
    }

    /// Subscribes to `channel`, returning a [`Subscription`] with a
    /// bounded queue of [`DEFAULT_SUBSCRIBER_CAPACITY`].
    #[must_use]
    pub fn subscribe(&self, channel: &str) -> Subscription {
        self.subscribe_with_capacity(channel, DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Subscribes to `channel` with an explicit queue capacity.
    #[must_use]
    pub fn subscribe_with_capacity(&self, channel: &str, capacity: usize) -> Subscription {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let dropped = Arc::new(AtomicUsize::new(0));
        let mut channels = self.channels.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        channels.entry(channel.to_string()).or_default().push(Subscriber { sender, dropped: dropped.clone() });
        Subscription { stream: ReceiverStream::new(receiver), dropped }
    }

    /// Publishes `message` (any `Serialize` payload) on `channel`. If the
    /// value serializes to a JSON object with no `timestamp` field, one
    /// is attached using `now_millis` before delivery.
    ///
    /// Subscribers with a full queue silently drop this message; other
    /// subscribers are unaffected (spec.md §4.2).
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Serialization`] if `message` cannot be
    /// serialized to JSON.
    pub fn publish<T, F>(&self, channel: &str, message: T, now_millis: F) -> Result<usize, BusError>
    where
        T: Serialize,
        F: FnOnce() -> i64,
    {
        let mut value =
            serde_json::to_value(message).map_err(|err| BusError::Serialization(err.to_string()))?;
        if let Value::Object(map) = &mut value
            && !map.contains_key("timestamp")
        {
            map.insert("timestamp".to_string(), Value::from(now_millis()));
        }
        self.publish_value(channel, value)
    }

    /// Publishes an already-built JSON value without timestamp injection.
    /// Used internally and by callers that have already stamped their
    /// payload.
    ///
    /// Returns the number of subscribers the message was accepted by
    /// (i.e. not dropped for a full queue).
    pub fn publish_value(&self, channel: &str, value: Value) -> Result<usize, BusError> {
        let snapshot: Vec<(mpsc::Sender<Value>, Arc<AtomicUsize>)> = {
            let channels = self.channels.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            channels
                .get(channel)
                .map(|subs| subs.iter().map(|s| (s.sender.clone(), s.dropped.clone())).collect())
                .unwrap_or_default()
        };
        let mut delivered = 0;
        for (sender, dropped) in &snapshot {
            if sender.try_send(value.clone()).is_ok() {
                delivered += 1;
            } else {
                // A full queue or a dropped receiver is a silent drop for
                // this one subscriber; other subscribers still receive the
                // message. Counted on the subscriber and recorded as a
                // warning-equivalent metric event rather than a log line.
                dropped.fetch_add(1, Ordering::Relaxed);
                self.metrics.record(MetricEvent { name: "bus.publish", outcome: "dropped" });
            }
        }
        Ok(delivered)
    }

    /// Number of live subscribers currently registered on `channel`.
    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        let channels = self.channels.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        channels.get(channel).map_or(0, Vec::len)
    }

    /// Drops subscribers on `channel` whose receiver has gone away.
    /// Publishers never need to call this for correctness (a dropped
    /// receiver just makes `try_send` fail silently); it exists to bound
    /// memory growth on long-lived channels with high subscriber churn.
    pub fn prune_closed(&self, channel: &str) {
        let mut channels = self.channels.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(subs) = channels.get_mut(channel) {
            subs.retain(|s| !s.sender.is_closed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_delivers_to_all_subscribers() {
        let bus = EventBus::new();
        let mut sub_a = bus.subscribe("grid_state");
        let mut sub_b = bus.subscribe("grid_state");

        let delivered = bus.publish("grid_state", serde_json::json!({"frequency_hz": 60.0}), || 1_000).unwrap();
        assert_eq!(delivered, 2);

        let msg_a = sub_a.recv().await.unwrap();
        let msg_b = sub_b.recv().await.unwrap();
        assert_eq!(msg_a["timestamp"], 1_000);
        assert_eq!(msg_b["frequency_hz"], 60.0);
    }

    #[tokio::test]
    async fn message_with_existing_timestamp_is_not_overwritten() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("agent_log");
        bus.publish("agent_log", serde_json::json!({"timestamp": 42, "message": "hi"}), || 999).unwrap();
        let msg = sub.recv().await.unwrap();
        assert_eq!(msg["timestamp"], 42);
    }

    #[tokio::test]
    async fn full_queue_drops_for_that_subscriber_only() {
        let bus = EventBus::new();
        let mut slow = bus.subscribe_with_capacity("guardian_event", 1);
        let mut fast = bus.subscribe_with_capacity("guardian_event", 10);

        bus.publish("guardian_event", serde_json::json!({"n": 1}), || 0).unwrap();
        let delivered = bus.publish("guardian_event", serde_json::json!({"n": 2}), || 0).unwrap();
        // `slow`'s queue (capacity 1) is already full from the first publish,
        // so the second publish is only accepted by `fast`.
        assert_eq!(delivered, 1);
        assert_eq!(slow.dropped_count(), 1);
        assert_eq!(fast.dropped_count(), 0);

        let first = slow.recv().await.unwrap();
        assert_eq!(first["n"], 1);

        let fast_first = fast.recv().await.unwrap();
        let fast_second = fast.recv().await.unwrap();
        assert_eq!(fast_first["n"], 1);
        assert_eq!(fast_second["n"], 2);
    }

    #[tokio::test]
    async fn dropped_message_is_recorded_through_metrics() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::atomic::Ordering;

        #[derive(Default)]
        struct CountingMetrics {
            dropped_events: AtomicUsize,
        }
        impl Metrics for CountingMetrics {
            fn record(&self, event: MetricEvent<'_>) {
                if event.name == "bus.publish" && event.outcome == "dropped" {
                    self.dropped_events.fetch_add(1, Ordering::Relaxed);
                }
            }
            fn observe_latency(&self, _name: &str, _latency: std::time::Duration) {}
        }

        let metrics = Arc::new(CountingMetrics::default());
        let bus = EventBus::with_metrics(metrics.clone());
        let _slow = bus.subscribe_with_capacity("guardian_event", 1);

        bus.publish("guardian_event", serde_json::json!({"n": 1}), || 0).unwrap();
        bus.publish("guardian_event", serde_json::json!({"n": 2}), || 0).unwrap();

        assert_eq!(metrics.dropped_events.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn subscriber_count_reflects_active_subscriptions() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count("grid_state"), 0);
        let _sub = bus.subscribe("grid_state");
        assert_eq!(bus.subscriber_count("grid_state"), 1);
    }
}
