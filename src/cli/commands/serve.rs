use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::app::{app, AppState};
use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgStore, Store};
use crate::services::{JobProcessor, OpenAiProducer, WorkerPool};

pub async fn handle(config: AppConfig, run_migrations: bool) -> anyhow::Result<()> {
    config.validate()?;
    tracing::info!("Starting Metal Vector in {:?} mode", config.environment);

    // Lazy pool: the server comes up (and /health reports 503) while the database is down
    let database = DatabaseManager::connect_lazy(&config.database)?;
    if run_migrations {
        database.migrate().await.context("failed to apply migrations")?;
    }

    let store: Arc<dyn Store> = Arc::new(PgStore::new(&database));
    let producer = Arc::new(OpenAiProducer::new(&config.producer)?);
    let processor = Arc::new(JobProcessor::new(store.clone(), producer, config.worker.job_timeout()));

    let shutdown = CancellationToken::new();
    let workers = WorkerPool::new(store.clone(), processor, &config.worker, shutdown.clone());
    let supervisor = workers.start();

    let tokens = Arc::new(TokenService::from_config(&config.security)?);
    let port = config.server.port;
    let state = AppState {
        config: Arc::new(config),
        store,
        tokens,
        workers: workers.clone(),
    };

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Metal Vector listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("HTTP server stopped; draining workers");
    workers.shutdown().await;
    if let Err(e) = supervisor.await {
        tracing::warn!("Worker supervisor ended abnormally: {}", e);
    }
    database.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
