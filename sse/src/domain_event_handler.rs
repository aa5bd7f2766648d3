use crate::message::{Event as SseEvent, Message as SseMessage};
use crate::Manager;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles domain events by converting them to SSE events and broadcasting
/// them to the conversation they belong to.
///
/// The persistence side decides what happened; this handler only routes it
/// to whoever is currently subscribed to that conversation.
pub struct SseDomainEventHandler {
    sse_manager: Arc<Manager>,
}

impl SseDomainEventHandler {
    pub fn new(sse_manager: Arc<Manager>) -> Self {
        Self { sse_manager }
    }
}

#[async_trait]
impl EventHandler for SseDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        let sse_event = match event {
            DomainEvent::MessageCreated {
                conversation_id,
                message,
            } => SseEvent::NewMessage {
                conversation_id: conversation_id.clone(),
                message: message.clone(),
            },
            DomainEvent::MessageUpdated {
                conversation_id,
                message,
            } => SseEvent::MessageUpdated {
                conversation_id: conversation_id.clone(),
                message: message.clone(),
            },
            DomainEvent::MessageDeleted {
                conversation_id,
                message_id,
            } => SseEvent::MessageDeleted {
                conversation_id: conversation_id.clone(),
                message_id: message_id.clone(),
            },
        };

        debug!(
            "Handling domain event for conversation {}",
            event.conversation_id()
        );

        self.sse_manager.send_message(SseMessage {
            event: sse_event,
            conversation_id: event.conversation_id().to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Frame, TopicId};
    use auth::Identity;
    use events::EventPublisher;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_message_created_reaches_conversation_subscribers() {
        let manager = Arc::new(Manager::default());
        let publisher = EventPublisher::new()
            .with_handler(Arc::new(SseDomainEventHandler::new(manager.clone())));

        let mut subscriber = manager
            .activate(TopicId::new("conv-1").unwrap(), Identity::new("user-1"))
            .unwrap();
        let mut bystander = manager
            .activate(TopicId::new("conv-2").unwrap(), Identity::new("user-2"))
            .unwrap();
        subscriber.recv().await.unwrap();
        bystander.recv().await.unwrap();

        publisher
            .publish(DomainEvent::MessageCreated {
                conversation_id: "conv-1".to_string(),
                message: json!({"id": 42, "body": "hi"}),
            })
            .await;

        match subscriber.recv().await.unwrap() {
            Frame::Event { name, data } => {
                assert_eq!(name, "new-message");
                let value: Value = serde_json::from_str(&data).unwrap();
                assert_eq!(
                    value,
                    json!({
                        "type": "new-message",
                        "conversation_id": "conv-1",
                        "message": {"id": 42, "body": "hi"}
                    })
                );
            }
            other => panic!("expected an event frame, got {other:?}"),
        }
        assert!(bystander.try_recv().is_none());
    }
}
