//! Application startup and lifecycle management.

use crate::config::FormConfig;
use crate::handlers;
use crate::services::{Dispatcher, FormRepository, GithubDispatcher, MongoDb, MongoFormRepository};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state. Both collaborators are injected so tests can
/// substitute fakes.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn FormRepository>,
    pub dispatcher: Arc<dyn Dispatcher>,
}

impl AppState {
    pub fn new(repository: Arc<dyn FormRepository>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/forms",
            get(handlers::list_forms).post(handlers::create_form),
        )
        .route(
            "/forms/:name",
            get(handlers::get_form)
                .put(handlers::update_form)
                .delete(handlers::delete_form),
        )
        .route("/dispatch", post(handlers::dispatch_workflow))
        .route("/health", get(handlers::health_check))
}

/// Routes are served both at the root and under `/api`, where older
/// front-ends also post dispatches to `/api/github/dispatch`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api_routes())
        .nest(
            "/api",
            api_routes().route("/github/dispatch", post(handlers::dispatch_workflow)),
        )
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .layer(from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: FormConfig) -> Result<Self, AppError> {
        tracing::info!(uri = %config.mongodb.redacted_uri(), "Connecting to MongoDB");
        let db = MongoDb::connect(config.mongodb.uri.expose_secret(), &config.mongodb.database)
            .await?;

        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let repository = Arc::new(MongoFormRepository::new(db));
        let dispatcher = Arc::new(GithubDispatcher::new(&config.dispatch.api_base_url));
        tracing::info!(api_base_url = %config.dispatch.api_base_url, "Dispatch client initialized");

        let router = build_router(AppState::new(repository, dispatcher));

        // Port 0 binds a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!("Listening on {}", self.port);
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
