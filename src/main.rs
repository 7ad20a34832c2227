use googler_server::models::{AppConfig, AppState};
use googler_server::services::{GoogleClient, InMemoryUserStore};
use googler_server::{app, telemetry};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let app_config = AppConfig::from_env()?;
    tracing::debug!(config = ?app_config, "configuration loaded");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let google = GoogleClient::new(&app_config, http);
    let bind_addr = app_config.bind_addr;

    let app_state = AppState::new(
        app_config,
        Arc::new(google),
        Arc::new(InMemoryUserStore::new()),
    );

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app(app_state).into_make_service()).await?;

    Ok(())
}
