use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod cache;
mod config;
mod domain;
mod health;
mod ingest;
mod messaging;
mod metrics;
mod service;
mod store;
mod utils;

use config::Config;
use messaging::{KafkaMessageSource, KafkaOrderProducer};
use service::OrderService;
use store::PgOrderStore;
use utils::{retry_with_backoff, RetryConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, override with RUST_LOG (e.g. RUST_LOG=debug)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_pipeline=debug")),
        )
        .init();

    tracing::info!("🚀 Starting order pipeline");

    let config = Config::from_env();
    let shutdown = CancellationToken::new();

    // === 1. Metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 2. Store (retried, the database may still be starting) ===
    tracing::info!("Connecting to Postgres...");
    let store = retry_with_backoff(&RetryConfig::startup(), "postgres_connect", |_| {
        PgOrderStore::connect(&config.postgres)
    })
    .await?;
    store.ensure_schema().await?;
    let store = Arc::new(store);

    // === 3. Queue writer and cache ===
    let producer = Arc::new(KafkaOrderProducer::new(&config.kafka, metrics.clone())?);
    let cache = cache::build_cache(&config.cache);

    let service = Arc::new(OrderService::new(
        producer,
        store,
        cache,
        metrics,
        shutdown.clone(),
    ));

    // === 4. Warm cache, then start consuming ===
    service.warm_cache(config.cache.warmup_limit).await;

    let source = KafkaMessageSource::new(&config.kafka)?;
    service.start_consumer(source, config.kafka.poll_backoff);

    // === 5. HTTP ===
    let data = web::Data::from(service.clone());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(api::configure)
    })
    .bind(("0.0.0.0", config.http.port))?
    .disable_signals()
    .run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tracing::info!("🌐 HTTP listening on http://0.0.0.0:{}", config.http.port);

    // === 6. Wait for a signal, then drain ===
    tokio::select! {
        _ = shutdown_signal() => tracing::info!("Shutdown signal received"),
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();

    server_handle.stop(true).await;
    match server_task.await {
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server error"),
        Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
        Ok(Ok(())) => {}
    }

    service.shutdown(config.shutdown_timeout).await;

    tracing::info!("👋 Order pipeline stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
