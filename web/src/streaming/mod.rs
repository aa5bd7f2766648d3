//! SSE HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for SSE endpoints.
//! The streaming core (Manager, TopicRegistry, lifecycle) lives in the `sse`
//! crate so publishers can use it without depending on the web layer.

pub mod handler;
