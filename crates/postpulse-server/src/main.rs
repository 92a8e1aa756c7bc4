mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use postpulse_analytics::{SnapshotService, SnapshotStore};
use postpulse_db::PgSnapshotStore;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(postpulse_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = postpulse_db::PoolConfig::from_app_config(&config);
    let pool = postpulse_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = postpulse_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");

    let store: Arc<dyn SnapshotStore> = Arc::new(PgSnapshotStore::new(pool.clone()));
    let snapshots = Arc::new(
        SnapshotService::new(store)
            .with_batch_size(config.snapshot_batch_size)
            .with_default_window_days(config.snapshot_window_days),
    );

    let _scheduler =
        scheduler::build_scheduler(pool.clone(), Arc::clone(&snapshots), Arc::clone(&config))
            .await?;

    let auth = AuthState::from_env(
        matches!(config.env, postpulse_core::Environment::Development),
        config.api_key_hash_salt.as_deref(),
    )?;
    let app = build_app(AppState { pool, snapshots }, auth, default_rate_limit_state());

    tracing::info!(bind_addr = %config.bind_addr, env = %config.env, "postpulse-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
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
