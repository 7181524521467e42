mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use murmur_harvest::Harvester;
use murmur_index::ElasticClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    scheduler::JobContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = murmur_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = murmur_db::PoolConfig::from_app_config(&config);
    let pool = murmur_db::connect_pool(&config.database_url, pool_config).await?;
    murmur_db::run_migrations(&pool).await?;

    let elastic = config
        .elastic
        .as_ref()
        .map(|es| ElasticClient::new(es, config.http_timeout_secs))
        .transpose()?;
    let harvester = Harvester::from_config(&config)?;
    if harvester.platforms().is_empty() {
        tracing::warn!("no platform credentials configured; no harvest jobs will run");
    }

    let _scheduler = scheduler::build_scheduler(Arc::new(JobContext {
        pool: pool.clone(),
        pool_config,
        harvester,
        elastic: elastic.clone(),
    }))
    .await?;

    let auth = AuthState::from_env(matches!(config.env, murmur_core::Environment::Development))?;
    let app = build_app(
        AppState::new(pool, pool_config, elastic),
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "murmur-server listening");
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
