use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use serde::Deserialize;
use sse::StreamRequest;
use utoipa::IntoParams;

/// Query parameters accepted by the subscribe endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StreamParams {
    /// The conversation to subscribe to.
    pub conversation_id: Option<String>,
    /// Subscriber token, for clients that cannot send an Authorization header.
    pub token: Option<String>,
}

/// Gathers everything the stream lifecycle needs from an inbound request:
/// the conversation id and both token sources. Deciding which token wins is
/// left to the lifecycle.
pub(crate) struct SubscribeRequest(pub StreamRequest);

#[async_trait]
impl<S> FromRequestParts<S> for SubscribeRequest
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<StreamParams>::try_from_uri(&parts.uri)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;

        // A header that is not valid UTF-8 is kept as an empty value so it is
        // rejected as malformed instead of silently ignored.
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default().to_string());

        Ok(SubscribeRequest(StreamRequest {
            conversation_id: params.conversation_id,
            authorization,
            query_token: params.token,
        }))
    }
}
