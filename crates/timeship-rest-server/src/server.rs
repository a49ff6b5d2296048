// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main server implementation

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Transport-level bound on one request/response exchange
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How long in-flight requests may drain after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// REST API server
pub struct Server {
    config: ServerConfig,
    app: Router,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = AppState::new(config.clone())?;
        let app = Self::build_app(state, &config);
        Ok(Self { config, app })
    }

    /// Build the Axum application with routes and middleware
    fn build_app(state: AppState, config: &ServerConfig) -> Router {
        let middleware_stack = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(Self::cors_layer(&config.cors_allowed_origins));

        let reserved = || {
            axum::routing::post(handlers::reserved::not_implemented)
                .delete(handlers::reserved::not_implemented)
                .patch(handlers::reserved::not_implemented)
        };

        let api_routes = Router::new()
            .route("/healthz", get(handlers::health::health_check))
            // Storage index
            .route("/storages", get(handlers::storages::list_storages))
            // Nodes: listing, metadata, byte stream
            .route(
                "/storages/:storage/nodes",
                get(handlers::nodes::list_root)
                    .post(handlers::reserved::not_implemented)
                    .delete(handlers::reserved::not_implemented)
                    .patch(handlers::reserved::not_implemented),
            )
            .route(
                "/storages/:storage/nodes/*path",
                get(handlers::nodes::get_node)
                    .post(handlers::reserved::not_implemented)
                    .delete(handlers::reserved::not_implemented)
                    .patch(handlers::reserved::not_implemented),
            )
            // Snapshot enumeration
            .route(
                "/storages/:storage/snapshots",
                get(handlers::snapshots::list_root),
            )
            .route(
                "/storages/:storage/snapshots/*path",
                get(handlers::snapshots::list_path),
            )
            // Reserved write surface
            .route("/storages/:storage/copies", reserved())
            .route("/storages/:storage/copies/*path", reserved())
            .route("/storages/:storage/moves", reserved())
            .route("/storages/:storage/moves/*path", reserved())
            .route("/storages/:storage/archives", reserved())
            .route("/storages/:storage/archives/*path", reserved());

        Router::new()
            .nest(&config.api_prefix, api_routes)
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(middleware_stack)
    }

    fn cors_layer(origins: &[String]) -> CorsLayer {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::PATCH])
            .allow_headers(AllowHeaders::any())
    }

    /// Run the server until a shutdown signal arrives, then drain in-flight
    /// requests for at most [`SHUTDOWN_GRACE`].
    pub async fn run(self) -> ServerResult<()> {
        let Server { config, app } = self;

        let listener = tokio::net::TcpListener::bind(config.bind_addr)
            .await
            .map_err(|err| {
                ServerError::Internal(format!("cannot bind {}: {}", config.bind_addr, err))
            })?;
        info!(addr = %config.bind_addr, root = %config.root.display(), "starting server");

        let draining = Arc::new(Notify::new());
        let graceful = {
            let draining = Arc::clone(&draining);
            async move {
                shutdown_signal().await;
                info!("shutdown signal received; draining in-flight requests");
                draining.notify_waiters();
            }
        };

        tokio::select! {
            result = axum::serve(listener, app).with_graceful_shutdown(graceful) => {
                result.map_err(|err| ServerError::Internal(err.to_string()))?;
            }
            _ = async {
                draining.notified().await;
                tokio::time::sleep(SHUTDOWN_GRACE).await;
            } => {
                warn!("graceful shutdown timed out; aborting in-flight requests");
            }
        }

        info!("server stopped");
        Ok(())
    }

    /// Get the bind address
    pub fn addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot install SIGTERM handler");
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
}
