use auth::TokenVerifier;
use config::Config;
use events::EventPublisher;
use log::info;
use sse::{Manager, SseDomainEventHandler};
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state shared by every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sse_manager: Arc<Manager>,
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub event_publisher: EventPublisher,
}

impl AppState {
    /// Builds the process-wide streaming state. The SSE manager (and with it
    /// the topic registry) is created here exactly once and shared by handle.
    pub fn new(app_config: Config, token_verifier: Arc<dyn TokenVerifier>) -> Self {
        let settings = app_config.sse_settings();
        info!(
            "SSE settings: keepalive_interval={}s, subscriber_buffer_size={}",
            settings.keepalive_interval.as_secs(),
            settings.buffer_size
        );

        let sse_manager = Arc::new(Manager::new(settings));
        let event_publisher = EventPublisher::new()
            .with_handler(Arc::new(SseDomainEventHandler::new(sse_manager.clone())));

        Self {
            config: app_config,
            sse_manager,
            token_verifier,
            event_publisher,
        }
    }

    pub fn verifier_ref(&self) -> &dyn TokenVerifier {
        self.token_verifier.as_ref()
    }
}
