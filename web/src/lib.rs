use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL},
    HeaderValue, Method,
};
use log::*;
use service::AppState;
use tower_http::cors::CorsLayer;

mod controller;
mod error;
mod extractors;
pub mod router;
mod streaming;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{}:{}", interface, app_state.config.port);

    let cors_layer = cors_layer(&app_state.config.allowed_origins);
    let router = router::define_routes(app_state).layer(cors_layer);

    let listener = tokio::net::TcpListener::bind(&server_url).await?;
    info!("Server starting... listening for connections on http://{server_url}");

    axum::serve(listener, router).await
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origin_values(allowed_origins))
        .allow_methods([Method::GET])
        .allow_headers([AUTHORIZATION, ACCEPT, CACHE_CONTROL])
        .allow_credentials(true)
}

// Credentialed CORS cannot be combined with a wildcard origin.
fn allowed_origin_values(allowed_origins: &[String]) -> Vec<HeaderValue> {
    allowed_origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| {
            if origin == "*" {
                warn!("Ignoring wildcard CORS origin; credentials require explicit origins");
                return None;
            }
            match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Ignoring invalid CORS origin {origin}: {e}");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_origin_is_dropped() {
        let origins = vec!["*".to_string(), "http://localhost:3000".to_string()];

        let values = allowed_origin_values(&origins);

        assert_eq!(values, vec![HeaderValue::from_static("http://localhost:3000")]);
    }

    #[test]
    fn test_cors_layer_builds_with_wildcard_in_config() {
        let origins = vec![" * ".to_string(), "http://localhost:3000".to_string()];

        let _layer = cors_layer(&origins);
    }

    #[test]
    fn test_invalid_and_blank_origins_are_skipped() {
        let origins = vec![
            "".to_string(),
            "http://bad\norigin".to_string(),
            "https://app.example.com".to_string(),
        ];

        let values = allowed_origin_values(&origins);

        assert_eq!(values, vec![HeaderValue::from_static("https://app.example.com")]);
    }
}
