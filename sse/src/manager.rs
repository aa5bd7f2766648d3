use crate::connection::{Frame, SubscriberConnection};
use crate::lifecycle::Settings;
use crate::message::{EventType, Message as SseMessage};
use crate::registry::TopicRegistry;
use log::*;
use serde::Serialize;
use std::sync::Arc;

/// Entry point for the streaming core: owns the topic registry, broadcasts
/// payloads to a conversation's subscribers and drives each connection's
/// lifecycle (see `lifecycle`).
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct Manager {
    pub(crate) registry: Arc<TopicRegistry>,
    pub(crate) settings: Settings,
}

impl Manager {
    pub fn new(settings: Settings) -> Self {
        Self {
            registry: Arc::new(TopicRegistry::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Best-effort broadcast of `payload` to every connection currently
    /// subscribed to `topic`.
    ///
    /// Never fails from the caller's side. Each subscriber gets one
    /// non-blocking write attempt; a subscriber whose sink is closed or full
    /// is closed and pruned, and is not retried. No redelivery, no
    /// backpressure.
    pub fn publish<P>(&self, topic: &str, payload: &P)
    where
        P: Serialize + ?Sized,
    {
        let subscribers = self.registry.snapshot(topic);
        if subscribers.is_empty() {
            trace!("No subscribers for topic {topic}, dropping event");
            return;
        }

        let frame = match Frame::from_payload(payload) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize SSE payload for topic {topic}: {e}");
                return;
            }
        };

        let mut failed = Vec::new();
        for connection in &subscribers {
            if let Err(e) = connection.push(frame.clone()) {
                warn!(
                    "Failed to send event to connection {}: {}. Connection will be cleaned up.",
                    connection.id().as_str(),
                    e
                );
                failed.push(connection);
            }
        }

        for connection in failed {
            self.close(connection);
        }

        debug!(
            "Published event to topic {topic}: {} subscriber(s)",
            subscribers.len()
        );
    }

    /// Send a typed event to the conversation it is addressed to.
    pub fn send_message(&self, message: SseMessage) {
        trace!(
            "Sending {} event to conversation {}",
            message.event.event_type(),
            message.conversation_id
        );
        self.publish(&message.conversation_id, &message.event);
    }

    /// Moves a connection to its terminal state: cancels its keepalive,
    /// removes it from the registry and releases its sink.
    ///
    /// Idempotent. The dispatcher and the transport may both call this for
    /// the same connection, concurrently; only the first call does anything.
    pub fn close(&self, connection: &SubscriberConnection) {
        if !connection.mark_closed() {
            return;
        }

        connection.release();
        self.registry.unregister(connection);

        info!(
            "Closed SSE connection {} for user {} on topic {}",
            connection.id().as_str(),
            connection.identity().subject,
            connection.topic()
        );
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry.subscriber_count(topic)
    }

    pub fn topic_count(&self) -> usize {
        self.registry.topic_count()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
