use auth::Identity;
use axum::response::sse::Event;
use log::*;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{error::TrySendError, Sender};
use tokio::task::JoinHandle;

/// Event name used when a payload carries no usable `type` field.
pub const DEFAULT_EVENT_NAME: &str = "message";

const KEEPALIVE_COMMENT: &str = "keepalive";

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Conversation id a stream is bound to. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicId(String);

impl TopicId {
    /// Returns `None` for an empty or all-whitespace id.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Lets the registry be queried with a plain `&str`.
impl Borrow<str> for TopicId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit written to a subscriber's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A named event whose data is a JSON document.
    Event { name: String, data: String },
    /// A comment line; clients ignore it.
    Comment(String),
}

impl Frame {
    /// Frames a serializable payload. The event name is taken from the
    /// payload's `type` field when it is a usable string.
    pub fn from_payload<P>(payload: &P) -> Result<Self, serde_json::Error>
    where
        P: Serialize + ?Sized,
    {
        let value = serde_json::to_value(payload)?;
        let name = value
            .get("type")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty() && !name.contains(['\n', '\r']))
            .unwrap_or(DEFAULT_EVENT_NAME)
            .to_string();

        Ok(Frame::Event {
            name,
            data: value.to_string(),
        })
    }

    pub fn keepalive() -> Self {
        Frame::Comment(KEEPALIVE_COMMENT.to_string())
    }
}

impl From<Frame> for Event {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Event { name, data } => Event::default().event(name).data(data),
            Frame::Comment(text) => Event::default().comment(text),
        }
    }
}

/// Why a single push to a subscriber's sink did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The connection was closed or the receiving side went away.
    Closed,
    /// The sink could not accept the frame without waiting.
    Full,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeliveryError::Closed => write!(f, "sink closed"),
            DeliveryError::Full => write!(f, "sink full"),
        }
    }
}

/// One open streaming session bound to a topic and a verified identity.
///
/// The connection exclusively owns its delivery sink and its keepalive task.
/// Both are released together, once, when the connection is closed.
pub struct SubscriberConnection {
    id: ConnectionId,
    topic: TopicId,
    identity: Identity,
    sink: Mutex<Option<Sender<Frame>>>,
    keepalive: Mutex<Option<JoinHandle<()>>>,
    alive: AtomicBool,
}

impl SubscriberConnection {
    pub(crate) fn new(topic: TopicId, identity: Identity, sink: Sender<Frame>) -> Self {
        Self {
            id: ConnectionId::new(),
            topic,
            identity,
            sink: Mutex::new(Some(sink)),
            keepalive: Mutex::new(None),
            alive: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Attempts a single non-blocking write of `frame` to the sink.
    pub fn push(&self, frame: Frame) -> Result<(), DeliveryError> {
        if !self.is_alive() {
            return Err(DeliveryError::Closed);
        }

        let sink = lock(&self.sink);
        let sender = sink.as_ref().ok_or(DeliveryError::Closed)?;
        sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Hands the keepalive task to the connection. A task attached after the
    /// connection has closed is aborted on the spot.
    pub(crate) fn attach_keepalive(&self, handle: JoinHandle<()>) {
        let mut keepalive = lock(&self.keepalive);
        if self.is_alive() {
            if let Some(previous) = keepalive.replace(handle) {
                previous.abort();
            }
        } else {
            handle.abort();
        }
    }

    /// Flips the liveness flag. Returns `true` only for the call that actually
    /// closed the connection.
    pub(crate) fn mark_closed(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }

    /// Cancels the keepalive task and drops the sink, which ends the stream
    /// once any buffered frames are drained.
    pub(crate) fn release(&self) {
        if let Some(handle) = lock(&self.keepalive).take() {
            handle.abort();
        }
        if lock(&self.sink).take().is_some() {
            trace!("Released sink for connection {}", self.id.as_str());
        }
    }
}

impl fmt::Debug for SubscriberConnection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SubscriberConnection")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("subject", &self.identity.subject)
            .field("alive", &self.is_alive())
            .finish()
    }
}

// The guarded values stay consistent even if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
