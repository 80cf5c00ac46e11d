mod api;
mod config;
mod state;
mod utils;
mod watch;

use std::sync::Arc;

use api::api_router;
use config::{config_path_from_env, load_or_create_config, resolve_path};
use parking_lot::RwLock;
use registry::{Registry, RegistryConfig};
use state::AppState;
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use watch::configure_watcher;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let registry_config = RegistryConfig {
        backgrounds_root: resolve_path(&config_path, &config.backgrounds_path),
        system_assets_root: resolve_path(&config_path, &config.system_assets_path),
        custom_assets_root: resolve_path(&config_path, &config.custom_assets_path),
    };
    // Root misconfiguration is the one fatal case; everything per-file is
    // recovered inside the registry.
    let registry = Arc::new(Registry::open(registry_config).await?);
    let catalog = registry.snapshot();
    info!("Background registry ready: {} backgrounds", catalog.records.len());

    let port = config.port;
    let state = AppState {
        registry,
        config_path,
        config: Arc::new(RwLock::new(config)),
        watcher: Arc::new(RwLock::new(None)),
    };
    configure_watcher(&state);

    let app = api_router(state)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }

    info!("Shutdown signal received.");
}
