//! FTO Navigator API Gateway
//!
//! The entry point for all external API requests.
//! Handles:
//! - Analysis submission, status polling, results and reports
//! - Patent provider access through a background worker pool
//! - Rate limiting
//! - Observability (logging, metrics)

mod handlers;
mod middleware;
mod provider;
mod report;
mod worker;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use fto_common::{
    config::{AppConfig, ObservabilityConfig},
    metrics, AnalysisStore, InMemoryAnalysisStore,
};
use fto_risk::RiskEngine;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{create_rate_limiter, rate_limit_middleware};
use crate::provider::PatentProvider;
use crate::worker::WorkerPool;

/// Time given to in-flight analyses after the server stops accepting requests
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<RiskEngine>,
    pub store: Arc<dyn AnalysisStore>,
    pub provider: Arc<dyn PatentProvider>,
    pub workers: WorkerPool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config.observability);

    info!("Starting FTO Navigator API Gateway v{}", fto_common::VERSION);

    config.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }

    let engine = Arc::new(RiskEngine::new(config.scoring.clone())?);
    let store: Arc<dyn AnalysisStore> =
        Arc::new(InMemoryAnalysisStore::with_capacity(config.store.max_records));
    let provider = provider::build_provider(&config.provider)?;
    info!(provider = provider.name(), "Patent provider ready");

    let (workers, worker_handles) =
        WorkerPool::spawn(&config.worker, engine.clone(), store.clone(), provider.clone());

    // Create app state
    let state = AppState {
        config: config.clone(),
        engine,
        store,
        provider,
        workers,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last queue sender; workers finish queued jobs and exit
    info!("Draining analysis workers...");
    if tokio::time::timeout(WORKER_DRAIN_TIMEOUT, futures::future::join_all(worker_handles))
        .await
        .is_err()
    {
        warn!("Analysis workers did not drain in time");
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("provider_duration_seconds".to_string()),
            metrics::PROVIDER_BUCKETS,
        )?
        .install()
        .context("failed to install Prometheus exporter")?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Analysis endpoints
        .route("/analyses", post(handlers::analyses::create_analysis))
        .route("/analyses/{id}", get(handlers::analyses::get_analysis))
        .route("/analyses/{id}/risk", get(handlers::analyses::get_risk))
        .route("/analyses/{id}/report", get(handlers::analyses::get_report))

        // Synchronous assessment
        .route("/assess", post(handlers::analyses::assess));

    let api_routes = if config.rate_limit.enabled {
        let limiter = create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );
        api_routes.layer(axum::middleware::from_fn_with_state(limiter, rate_limit_middleware))
    } else {
        api_routes
    };

    // Compose the app
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .route_layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests.max(1)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
