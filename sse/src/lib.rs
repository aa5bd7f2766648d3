//! Server-Sent Events (SSE) infrastructure for real-time chat delivery.
//!
//! Browser clients subscribe to one conversation over a long-lived
//! `text/event-stream` response. Whenever a message is stored, the
//! persistence side publishes it here and every client currently subscribed
//! to that conversation receives it.
//!
//! # Architecture
//!
//! - **One stream, one topic**: each connection is bound to a single
//!   conversation id and a verified identity for its whole life.
//! - **Topic registry**: a `DashMap` from conversation id to its live
//!   connections. Publishing iterates a copied snapshot, never the live set.
//! - **Best-effort delivery**: at-most-once, no redelivery, no backpressure.
//!   A subscriber whose sink is closed or full is closed and pruned; the
//!   publisher never sees an error.
//! - **Owned keepalive**: every connection owns a periodic task that writes a
//!   comment frame. It is cancelled when the connection closes, and a failed
//!   keepalive closes the connection.
//! - **Ephemeral**: nothing is persisted. After a restart clients resubscribe
//!   and reload history from the message store.
//!
//! # Message Flow
//!
//! 1. Client opens `/sse?conversation_id=...` with a token (header or query)
//! 2. [`Manager::connect`] checks the conversation id, resolves the token and
//!    asks the [`auth::TokenVerifier`] for an identity
//! 3. The connection is registered and a `connected` frame is queued
//! 4. A message handler calls [`Manager::publish`] (or publishes a
//!    `DomainEvent` that [`SseDomainEventHandler`] forwards)
//! 5. The client disconnects; dropping the [`Subscription`] closes the
//!    connection
//!
//! # Example: Publishing a message
//!
//! ```rust,ignore
//! use serde_json::json;
//!
//! app_state.sse_manager.publish(
//!     &conversation_id,
//!     &json!({"type": "new-message", "id": message.id}),
//! );
//! ```

pub mod connection;
pub mod domain_event_handler;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod message;
pub mod registry;

pub use domain_event_handler::SseDomainEventHandler;
pub use lifecycle::{Settings, StreamRequest, Subscription};
pub use manager::Manager;
