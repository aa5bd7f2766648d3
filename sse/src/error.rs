//! Error types for the `sse` crate.
//!
//! Only subscribe setup can fail from a caller's point of view. Delivery
//! failures during a broadcast are recovered inside the dispatcher and are
//! modelled separately by [`crate::connection::DeliveryError`].

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The stream request did not name a conversation.
    BadRequest,
    /// The token was absent, malformed or rejected by the verifier.
    Unauthorized,
    /// Unexpected fault while setting the connection up.
    Internal,
}

impl Error {
    pub fn bad_request(message: &str) -> Self {
        Self::with_message(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::with_message(ErrorKind::Unauthorized, message)
    }

    pub fn internal(message: &str) -> Self {
        Self::with_message(ErrorKind::Internal, message)
    }

    fn with_message(error_kind: ErrorKind, message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "SSE Error: {:?}: {}", self.error_kind, source),
            None => write!(f, "SSE Error: {:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Every verifier failure is fatal to the subscribe attempt.
impl From<auth::Error> for Error {
    fn from(err: auth::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Unauthorized,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_errors_become_unauthorized() {
        let err: Error = auth::Error::new(auth::error::ErrorKind::Expired, "expired").into();
        assert_eq!(err.error_kind, ErrorKind::Unauthorized);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = Error::bad_request("conversation_id is required");
        assert_eq!(
            err.to_string(),
            "SSE Error: BadRequest: conversation_id is required"
        );
    }
}
