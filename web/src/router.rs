use crate::{controller::health_check_controller, streaming, AppState};
use axum::{response::IntoResponse, routing::get, Json, Router};

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

// This is the global definition of our OpenAPI document. To be a part
// of the rendered document, a path must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Chat Stream API"
        ),
        paths(
            health_check_controller::health_check,
            streaming::handler::sse_handler,
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "chat_stream", description = "Real-time conversation event streams")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Subscribers authenticate with a bearer token. Browser EventSource clients,
// which cannot set headers, pass the same token as the `token` query parameter.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(sse_routes(app_state))
        .merge(openapi_routes())
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse", get(streaming::handler::sse_handler))
        .with_state(app_state)
}

fn openapi_routes() -> Router {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_stream_and_health_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/sse"));
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc
            .components
            .unwrap()
            .security_schemes
            .contains_key("bearer_auth"));
    }
}
