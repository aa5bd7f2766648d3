//! Error types for the `auth` crate.
//!
//! Follows the same pattern as the other crates in the workspace: a root
//! `Error` struct holding an error kind and an optional source for chaining.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Reasons a token can fail verification.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// No token was supplied at all.
    Missing,
    /// The token could not be parsed (bad encoding, wrong shape).
    Malformed,
    /// The token parsed but its expiry has passed.
    Expired,
    /// Signature, issuer or claims did not check out.
    Invalid,
    /// The verifier itself failed (misconfiguration, crypto backend).
    Internal,
}

impl Error {
    pub fn new(error_kind: ErrorKind, message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Token error: {:?} ({})", self.error_kind, source),
            None => write!(f, "Token error: {:?}", self.error_kind),
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

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind as JwtErrorKind;

        let error_kind = match err.kind() {
            JwtErrorKind::ExpiredSignature => ErrorKind::Expired,
            JwtErrorKind::InvalidToken
            | JwtErrorKind::Base64(_)
            | JwtErrorKind::Json(_)
            | JwtErrorKind::Utf8(_) => ErrorKind::Malformed,
            JwtErrorKind::InvalidKeyFormat | JwtErrorKind::MissingAlgorithm => {
                ErrorKind::Internal
            }
            _ => ErrorKind::Invalid,
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
