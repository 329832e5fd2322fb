// File: src/main.rs
// Purpose: Serve the reservation proxy, or probe resOS with --diagnose

use anyhow::{Context, Result};
use reservas::resos::ProbeBody;
use reservas::{router, Config, ProxyState, ResosClient};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load_default().context("Failed to load configuration")?;

    if config.resos.api_key.is_empty() {
        warn!("RESOS_API_KEY is not set; resOS will reject every booking");
    }

    if std::env::args().any(|arg| arg == "--diagnose") {
        return diagnose(&config).await;
    }

    let state = ProxyState::from_config(&config).context("Failed to build resOS client")?;
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, environment = ?config.app.environment, "reservation proxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// Check that resOS answers with JSON for the configured credentials
async fn diagnose(config: &Config) -> Result<()> {
    let client = ResosClient::from_config(&config.resos)?;
    info!(base_url = client.base_url(), "probing resOS");

    let report = client.probe().await.context("resOS is unreachable")?;
    info!(
        status = report.status,
        content_type = report.content_type.as_deref().unwrap_or("none"),
        "resOS answered"
    );

    match report.body {
        ProbeBody::Json if report.is_healthy() => {
            info!("resOS connection OK");
            Ok(())
        }
        ProbeBody::Json => anyhow::bail!("resOS returned HTTP {}", report.status),
        ProbeBody::Html => {
            error!("resOS returned an HTML page, likely an error or login page");
            anyhow::bail!("resOS returned HTML (HTTP {})", report.status)
        }
        ProbeBody::Other => anyhow::bail!("resOS returned a non-JSON body (HTTP {})", report.status),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("shutting down");
}
