//! Token verification for streaming subscribers.
//!
//! Browser-native `EventSource` clients cannot attach custom headers, so the
//! subscribe endpoint receives an opaque token that must be turned into a
//! verified [`Identity`] before any connection is registered. The
//! [`TokenVerifier`] trait is the seam: the server wires in [`JwtVerifier`],
//! tests wire in their own doubles.

use async_trait::async_trait;

pub mod error;
pub mod jwt;

pub use error::Error;
pub use jwt::JwtVerifier;

/// The verified subject a token resolves to. Bound to a subscriber connection
/// at creation and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub subject: String,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Resolves an opaque token into a verified identity.
///
/// Implementations must be idempotent and free of side effects visible to the
/// caller. Any `Err` is treated as fatal to the subscribe attempt.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, Error>;
}
