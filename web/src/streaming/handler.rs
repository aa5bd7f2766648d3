use crate::error::Error;
use crate::extractors::stream_request::{StreamParams, SubscribeRequest};
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use futures::StreamExt;
use log::*;
use service::AppState;
use std::convert::Infallible;

// Keeps reverse proxies such as nginx from buffering the stream.
const X_ACCEL_BUFFERING: &str = "x-accel-buffering";

/// GET a long-lived event stream for one conversation
#[utoipa::path(
    get,
    path = "/sse",
    params(StreamParams),
    responses(
        (status = 200, description = "text/event-stream opened; the first event is `connected`"),
        (status = 400, description = "conversation_id is missing"),
        (status = 401, description = "Token is missing, malformed or rejected"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub(crate) async fn sse_handler(
    State(app_state): State<AppState>,
    SubscribeRequest(request): SubscribeRequest,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "Establishing SSE connection for conversation {:?}",
        request.conversation_id
    );

    let subscription = app_state
        .sse_manager
        .connect(request, app_state.verifier_ref())
        .await?;

    let stream = subscription
        .into_stream()
        .map(|frame| Ok::<Event, Infallible>(Event::from(frame)));

    Ok(([(X_ACCEL_BUFFERING, "no")], Sse::new(stream)))
}
