//! Stream lifecycle: `CONNECTING -> ACTIVE -> CLOSED`.
//!
//! `CONNECTING` checks the request cheapest-first: a missing conversation id
//! is rejected before the token is even looked at, and a missing token before
//! the verifier is called. Only a verified request becomes `ACTIVE`: the
//! connection is registered, receives one `connected` frame and gets its own
//! keepalive task. `CLOSED` is reached through [`Manager::close`], either when
//! the transport drops the [`Subscription`] or when a delivery fails.

use crate::connection::{Frame, SubscriberConnection, TopicId};
use crate::error::Error;
use crate::message::Event as SseEvent;
use crate::Manager;
use async_stream::stream;
use auth::{Identity, TokenVerifier};
use futures::Stream;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_BUFFER_SIZE: usize = 32;

const BEARER_SCHEME: &str = "Bearer";

/// Tunables for every stream opened through a [`Manager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Cadence of the keepalive comment frame.
    pub keepalive_interval: Duration,
    /// Frames a subscriber may have pending before it counts as failed.
    pub buffer_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// What the transport hands over when a client opens a stream.
#[derive(Debug, Clone, Default)]
pub struct StreamRequest {
    pub conversation_id: Option<String>,
    /// Raw `Authorization` header value, if any.
    pub authorization: Option<String>,
    /// `token` query parameter, for clients that cannot set headers.
    pub query_token: Option<String>,
}

/// Picks the subscriber token. The `Authorization` header wins whenever it is
/// present; the query parameter is only a fallback. A header that is not a
/// non-empty `Bearer` credential is rejected rather than skipped.
pub fn resolve_token(
    authorization: Option<&str>,
    query_token: Option<&str>,
) -> Result<String, Error> {
    if let Some(header) = authorization {
        let token = header
            .trim()
            .split_once(char::is_whitespace)
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case(BEARER_SCHEME))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::unauthorized("malformed Authorization header"))?;
        return Ok(token.to_string());
    }

    query_token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::unauthorized("missing token"))
}

impl Manager {
    /// Runs the `CONNECTING` checks and, on success, opens an `ACTIVE`
    /// subscription. On any error nothing has been registered.
    pub async fn connect(
        &self,
        request: StreamRequest,
        verifier: &dyn TokenVerifier,
    ) -> Result<Subscription, Error> {
        let topic = request
            .conversation_id
            .and_then(TopicId::new)
            .ok_or_else(|| Error::bad_request("conversation_id is required"))?;

        let token = resolve_token(
            request.authorization.as_deref(),
            request.query_token.as_deref(),
        )?;

        let identity = verifier.verify(&token).await.map_err(|e| {
            warn!("Rejected SSE subscription to topic {topic}: {e}");
            Error::from(e)
        })?;

        self.activate(topic, identity)
    }

    /// Enters `ACTIVE` for an already verified identity.
    pub fn activate(&self, topic: TopicId, identity: Identity) -> Result<Subscription, Error> {
        let (tx, rx) = mpsc::channel(self.settings.buffer_size.max(1));
        let connection = Arc::new(SubscriberConnection::new(topic, identity, tx));

        // Queued before registration so it is always the first frame out.
        let connected = Frame::from_payload(&SseEvent::Connected)?;
        connection
            .push(connected)
            .map_err(|e| Error::internal(&format!("could not queue connected frame: {e}")))?;

        self.registry.register(connection.clone());
        connection.attach_keepalive(self.spawn_keepalive(&connection));

        info!(
            "Registered SSE connection {} for user {} on topic {}",
            connection.id().as_str(),
            connection.identity().subject,
            connection.topic()
        );

        Ok(Subscription {
            receiver: rx,
            guard: ConnectionGuard {
                manager: self.clone(),
                connection,
            },
        })
    }

    /// Emits a keepalive comment every interval until the connection closes.
    /// A keepalive that cannot be delivered closes the connection, so a dead
    /// client never outlives one interval in the registry.
    fn spawn_keepalive(&self, connection: &Arc<SubscriberConnection>) -> JoinHandle<()> {
        let manager = self.clone();
        let connection = Arc::downgrade(connection);
        let period = self.settings.keepalive_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(connection) = connection.upgrade() else {
                    break;
                };
                if let Err(e) = connection.push(Frame::keepalive()) {
                    debug!(
                        "Keepalive failed for connection {}: {e}",
                        connection.id().as_str()
                    );
                    manager.close(&connection);
                    break;
                }
                trace!("Sent keepalive to connection {}", connection.id().as_str());
            }
        })
    }
}

/// Closes its connection when dropped, which is how transport cancellation
/// reaches the registry.
struct ConnectionGuard {
    manager: Manager,
    connection: Arc<SubscriberConnection>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.close(&self.connection);
    }
}

/// The receiving end of an `ACTIVE` stream.
pub struct Subscription {
    receiver: mpsc::Receiver<Frame>,
    guard: ConnectionGuard,
}

impl Subscription {
    pub fn connection(&self) -> &Arc<SubscriberConnection> {
        &self.guard.connection
    }

    /// Next frame, or `None` once the connection has closed and its buffer is
    /// drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`Subscription::recv`].
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }

    /// Turns the subscription into a frame stream for the transport. Dropping
    /// the stream closes the connection.
    pub fn into_stream(self) -> impl Stream<Item = Frame> + Send + 'static {
        let mut subscription = self;
        stream! {
            while let Some(frame) = subscription.recv().await {
                yield frame;
            }
            debug!(
                "SSE stream ended for connection {}",
                subscription.connection().id().as_str()
            );
        }
    }
}
