//! riptd: RIPT gateway daemon.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use ript_core::config::RiptConfig;
use ript_core::CloseReason;
use ript_net::{GatewayState, LoopbackRouter};

/// How long in-flight requests get to finish after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = RiptConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = RiptConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        RiptConfig::default()
    });
    let gateway = config.gateway;

    let listen = std::env::args()
        .nth(1)
        .unwrap_or_else(|| gateway.listen_addr());
    tracing::info!(
        listen,
        base_path = %gateway.base_path,
        correlation_timeout_ms = gateway.correlation_timeout_ms,
        trunk_groups = ?gateway.trunk_groups,
        "riptd starting"
    );

    let (state, feed) = GatewayState::from_config(&gateway);
    let directory = state.directory.clone();

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let mut router_task =
        tokio::spawn(LoopbackRouter::new(&gateway, feed, shutdown_tx.subscribe()).run());

    let listener = TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind gateway listener on {}", listen))?;
    let app = ript_net::router(state, &gateway.base_path);
    let mut server_task = {
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(ript_net::serve(listener, app, async move {
            let _ = shutdown_rx.recv().await;
        }))
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv()  => tracing::info!("shutting down"),
        r = &mut router_task    => tracing::error!("router exited: {:?}", r),
        r = &mut server_task    => tracing::error!("http server exited: {:?}", r),
    }
    let _ = shutdown_tx.send(());

    // Closing every face releases requests still waiting on a reply.
    let closed = directory.close_all(CloseReason::Shutdown);
    tracing::info!(closed, "faces closed");

    if !server_task.is_finished() {
        match tokio::time::timeout(DRAIN_TIMEOUT, &mut server_task).await {
            Ok(_) => tracing::info!("http server drained"),
            Err(_) => tracing::warn!("http server did not drain in time"),
        }
    }

    Ok(())
}
