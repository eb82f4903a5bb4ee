use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use trendscout_api::{AppConfig, AppState, build_router};
use trendscout_core::{ConfigLoader, TelemetryOptions, init_telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::load(None)?;
    init_telemetry(TelemetryOptions::default().with_level(config.logging.level.clone()))?;

    let app_config = AppConfig::from_env()?;
    let missing = config.missing_credentials();
    if !missing.is_empty() {
        warn!(missing = ?missing, "credentials unset; pipeline runs will fail");
    }
    if app_config.api_key.is_none() {
        warn!("API_KEY is unset; protected endpoints will reject every request");
    }

    let state = AppState::try_new(&config, &app_config)?;
    let app: Router = build_router(state);

    let listener = TcpListener::bind(&app_config.listen_addr).await?;
    info!(address = %app_config.listen_addr, "trendscout-api listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            error!(error = %err, "server shutdown with error");
            err
        })?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            stream.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
