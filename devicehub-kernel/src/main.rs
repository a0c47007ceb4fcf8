/**
 * DEVICEHUB KERNEL - Point d'entrée du serveur
 *
 * RÔLE : Bootstrap : config, logs, store, bus d'événements, utilisateurs
 * initiaux, surveillance d'expiration des devices, puis serveur HTTP.
 *
 * ARCHITECTURE : API REST (Axum) + store de documents JSON + événements MQTT optionnels.
 */

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use devicehub_kernel::config::load_config;
use devicehub_kernel::devices::DeviceRegistry;
use devicehub_kernel::events::{spawn_mqtt_events, NullEvents, SharedEvents};
use devicehub_kernel::health::HealthTracker;
use devicehub_kernel::http;
use devicehub_kernel::state::AppState;
use devicehub_kernel::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    // Variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("devicehub_kernel=info,tower_http=info")),
        )
        .init();

    let cfg = load_config().await;
    tracing::info!(
        "[kernel] starting (data_dir: {:?}, device timeout: {}s, session lease: {:?}s)",
        cfg.data_dir,
        cfg.device_timeout_seconds,
        cfg.session_lease_seconds
    );

    let store = match &cfg.data_dir {
        Some(dir) => Store::open(dir).with_context(|| format!("failed to open store at {dir:?}"))?,
        None => {
            tracing::warn!("[kernel] no data_dir configured, documents are kept in memory only");
            Store::in_memory()
        }
    };
    let store = Arc::new(store);

    let health_tracker = HealthTracker::new();
    let events: SharedEvents = match &cfg.mqtt {
        Some(mqtt) => Arc::new(spawn_mqtt_events(mqtt, health_tracker.clone())),
        None => Arc::new(NullEvents),
    };

    let app_state = AppState::new(cfg.clone(), store, events, health_tracker);
    app_state.users.seed(&cfg.users).context("failed to seed users")?;

    // retire les devices inactifs
    DeviceRegistry::start_expiry_monitoring(app_state.devices.clone(), cfg.expiry_sweep());

    let app = http::build_router(app_state);

    let listener = TcpListener::bind(cfg.listen.as_str())
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen))?;
    tracing::info!("[kernel] listening on http://{}", cfg.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;
    tracing::info!("[kernel] stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[kernel] cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
