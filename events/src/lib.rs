//! Event seam between the chat's persistence handlers and real-time delivery.
//!
//! Message-creation handlers (owned elsewhere) publish a [`DomainEvent`] once
//! a write has succeeded. Registered [`EventHandler`]s react to it; the SSE
//! bridge turns each event into a broadcast to the conversation's
//! subscribers.
//!
//! This crate has no dependencies on other workspace crates so every layer can
//! depend on it. Message bodies are carried as serialized JSON values.

use async_trait::async_trait;
use log::*;
use serde_json::Value;
use std::sync::Arc;

/// Conversation identifiers are opaque strings supplied by the clients.
pub type ConversationId = String;

/// Business-level changes to a conversation.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A new message was stored in a conversation.
    MessageCreated {
        conversation_id: ConversationId,
        /// The stored message, already serialized by the persistence layer.
        message: Value,
    },
    /// An existing message was edited.
    MessageUpdated {
        conversation_id: ConversationId,
        message: Value,
    },
    /// A message was removed; only its id survives.
    MessageDeleted {
        conversation_id: ConversationId,
        message_id: String,
    },
}

impl DomainEvent {
    pub fn conversation_id(&self) -> &str {
        match self {
            DomainEvent::MessageCreated {
                conversation_id, ..
            }
            | DomainEvent::MessageUpdated {
                conversation_id, ..
            }
            | DomainEvent::MessageDeleted {
                conversation_id, ..
            } => conversation_id,
        }
    }
}

/// Trait for handling domain events.
/// Implementations perform side effects like pushing notifications.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers, in order. Fire-and-forget:
    /// handlers report nothing back to the publisher.
    pub async fn publish(&self, event: DomainEvent) {
        trace!(
            "Publishing domain event for conversation {} to {} handler(s)",
            event.conversation_id(),
            self.handlers.len()
        );
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
