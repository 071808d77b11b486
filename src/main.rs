// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use axum::{routing::get, Router};
use tokio::sync::watch;
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::application::coordinator::Coordinator;
use crate::application::device_api::HomevoltApi;
use crate::application::poller::Poller;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::homevolt_client::HomevoltClient;
use crate::infrastructure::ndjson_stream::NDJSON_CONTENT_TYPE;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{diagnostics, health_check, latest_snapshot, stream_events, summary};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let addr = settings.server.addr()?;

    // Device client (infrastructure layer)
    let client = Arc::new(HomevoltClient::new(&settings.device)?);
    info!(
        host = client.host(),
        url = client.base_url(),
        scan_interval_secs = settings.polling.scan_interval_secs,
        "booting homevolt-telemetry"
    );

    match client.validate_connection().await {
        Ok(ems) => info!(
            firmware = %ems.aggregated.ems_info.fw_version,
            sensors = ems.sensors.len(),
            "device reachable"
        ),
        Err(e) if e.is_auth() => error!(error = %e, "device rejected the configured password"),
        Err(e) => warn!(error = %e, "device not reachable yet, polling will keep trying"),
    }

    // Coordinator and poller (application layer)
    let coordinator = Coordinator::new(client.clone());
    let handle = coordinator.handle();
    let poller = Poller::new(coordinator, settings.polling.scan_interval());
    let health = poller.health();
    tokio::spawn(async move {
        let err = poller.run().await;
        error!(error = %err, "polling stopped");
    });

    let (shutdown_tx, shutdown) = watch::channel(false);
    let state = Arc::new(AppState {
        coordinator: handle,
        health,
        device: settings.device.clone(),
        shutdown,
    });

    // Build router (presentation layer)
    // The event stream is left uncompressed so lines are flushed as they happen
    let compression = CompressionLayer::new()
        .compress_when(DefaultPredicate::new().and(NotForContentType::const_new(NDJSON_CONTENT_TYPE)));
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/snapshot", get(latest_snapshot))
        .route("/summary", get(summary))
        .route("/diagnostics", get(diagnostics))
        .route("/events", get(stream_events))
        .layer(compression)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!(%addr, "starting homevolt-telemetry service");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutting down");
            // ends open event streams so connections can drain
            shutdown_tx.send_replace(true);
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
