pub(crate) mod stream_request;

use axum::http::StatusCode;

type RejectionType = (StatusCode, String);
