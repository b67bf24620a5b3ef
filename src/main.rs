//! Fluently Bot webhook server
//!
//! Loads configuration from `FLUENTLY__*` environment variables, connects
//! to Redis and the Fluently backend, and serves `POST /events`.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fluently_bot::adapters::backend::{BackendApiClient, BackendClientConfig};
use fluently_bot::adapters::http::{webhook_routes, WebhookState};
use fluently_bot::adapters::session::{LockSettings, RedisSessionStore};
use fluently_bot::application::{Collaborators, LessonOrchestrator};
use fluently_bot::config::AppConfig;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config);

    let client = redis::Client::open(config.redis.url.as_str())?;
    let conn = client.get_multiplexed_async_connection().await?;
    let store = RedisSessionStore::new(
        conn,
        config.session.clone(),
        LockSettings::from(&config.redis),
    );

    let backend = BackendApiClient::new(BackendClientConfig::from(&config.backend))?;
    let orchestrator = LessonOrchestrator::new(
        Arc::new(store),
        Collaborators::from_backend(Arc::new(backend)),
        config.session.clone(),
    )
    .with_call_timeout(config.backend.timeout());

    let mut state = WebhookState::new(Arc::new(orchestrator));
    if let Some(secret) = config.server.webhook_secret.clone().filter(|s| !s.is_empty()) {
        state = state.with_secret(SecretString::new(secret));
    }
    let app = webhook_routes(state, Duration::from_secs(config.server.request_timeout_secs));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, environment = ?config.server.environment, "webhook server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
