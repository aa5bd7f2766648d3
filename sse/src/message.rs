use serde::Serialize;
use serde_json::Value;

/// Trait for getting the SSE event type name
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

/// Payloads the chat pushes to subscribers. Serialized with an inline
/// `type` tag, which also becomes the SSE event name.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// First frame on every stream; tells the client the channel is live.
    #[serde(rename = "connected")]
    Connected,

    #[serde(rename = "new-message")]
    NewMessage {
        conversation_id: String,
        message: Value,
    },
    #[serde(rename = "message-updated")]
    MessageUpdated {
        conversation_id: String,
        message: Value,
    },
    #[serde(rename = "message-deleted")]
    MessageDeleted {
        conversation_id: String,
        message_id: String,
    },
}

impl EventType for Event {
    fn event_type(&self) -> &'static str {
        match self {
            Event::Connected => "connected",
            Event::NewMessage { .. } => "new-message",
            Event::MessageUpdated { .. } => "message-updated",
            Event::MessageDeleted { .. } => "message-deleted",
        }
    }
}

/// A typed event addressed to one conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub event: Event,
    pub conversation_id: String,
}
