mod api;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use rack_core::{JsonFileStore, StoredConfig};
use rack_source::{CachedSheetSource, SheetClient};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState, RateLimits},
    middleware::AdminAuth,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(rack_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = JsonFileStore::new(&config.config_path);
    let stored: StoredConfig = rack_core::ConfigStore::load(&store)?;
    tracing::info!(
        env = %config.env,
        config_path = %config.config_path.display(),
        source_configured = stored.has_source(),
        "starting rack-server"
    );

    let client = SheetClient::with_base_url(
        config.fetch_timeout_secs,
        &config.fetch_user_agent,
        config.fetch_max_retries,
        config.fetch_retry_backoff_base_ms,
        &config.sheets_base_url,
    )?;
    let source = CachedSheetSource::new(client, Duration::from_secs(config.cache_ttl_secs));
    let auth = AdminAuth::new(config.admin_password.as_deref());

    let state = AppState {
        config: Arc::clone(&config),
        store: Arc::new(store),
        source: Arc::new(source),
        auth,
    };
    let app = build_app(state, RateLimits::default());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
