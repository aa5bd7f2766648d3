use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use sse::error::{Error as SseError, ErrorKind as SseErrorKind};

#[derive(Debug)]
pub struct Error(SseError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// No stream is ever opened on an error path, so these are plain responses.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            SseErrorKind::BadRequest => (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response(),
            SseErrorKind::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response()
            }
            SseErrorKind::Internal => {
                error!("Internal error while opening SSE stream: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<SseError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_status_codes() {
        let cases = [
            (SseError::bad_request("missing"), StatusCode::BAD_REQUEST),
            (SseError::unauthorized("denied"), StatusCode::UNAUTHORIZED),
            (
                SseError::internal("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(Error::from(err).into_response().status(), status);
        }
    }
}
