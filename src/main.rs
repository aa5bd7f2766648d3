use auth::JwtVerifier;
use log::*;
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    info!(
        "Starting up chat_stream [{}] in {} mode",
        env!("CARGO_PKG_VERSION"),
        config.runtime_env()
    );

    let Some(jwt_secret) = config.jwt_secret() else {
        error!("JWT_SECRET must be set to verify subscriber tokens");
        std::process::exit(1);
    };
    let verifier = Arc::new(JwtVerifier::new(jwt_secret, config.jwt_issuer()));

    let app_state = AppState::new(config, verifier);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped with error: {e}");
        std::process::exit(1);
    }
}
