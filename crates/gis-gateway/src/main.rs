//! Madinah GIS Gateway
//!
//! gRPC front for the Madinah GIS platform.
//!
//! # Servers
//!
//! - gRPC server for `MadinaGisService` plus reflection (default: 0.0.0.0:50051)
//! - HTTP server for health endpoints (default: 0.0.0.0:8081)
//!
//! # Startup Flow
//!
//! 1. Apply `.env` (if present) and initialize tracing
//! 2. Load configuration from environment
//! 3. Open the Redis token cache; an unreachable server is only logged, the
//!    connection is retried lazily on first use
//! 4. Build `TokenManager`, `GisClient` and `GisService`
//! 5. Start health HTTP server
//! 6. Bind and serve gRPC, mark ready
//! 7. On Ctrl+C/SIGTERM: mark not ready, drain gRPC, stop health server

#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // main.rs orchestrates startup, naturally longer

use std::net::SocketAddr;
use std::sync::Arc;

use common::token_manager::TokenManager;
use gis_gateway::config::Config;
use gis_gateway::errors::GisError;
use gis_gateway::grpc::{reflection_service, GisService};
use gis_gateway::observability::{health_router, HealthState};
use gis_gateway::redis::RedisTokenStore;
use gis_gateway::services::{GisClient, GisEndpoints};
use proto_gen::gis::madina_gis_service_server::MadinaGisServiceServer;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is the normal case outside local development.
    let dotenv_result = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gis_gateway=info,common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Madinah GIS Gateway");

    match dotenv_result {
        Ok(path) => info!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env file, continuing with process environment"),
    }

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        grpc_bind_address = %config.grpc_bind_address,
        health_bind_address = %config.health_bind_address,
        token_url = %config.token_url,
        map_server_url = %config.map_server_url,
        location_service_url = %config.location_service_url,
        http_timeout_secs = config.http_timeout.as_secs(),
        redis_op_timeout = ?config.redis_op_timeout,
        "Configuration loaded successfully"
    );

    let health_state = Arc::new(HealthState::new());

    // Shared token cache
    let token_store = RedisTokenStore::new(config.expose_redis_url())
        .map_err(|e| {
            error!(error = %e, "Invalid Redis configuration");
            e
        })?
        .with_op_timeout(config.redis_op_timeout);

    match token_store.connect().await {
        Ok(()) => info!("Redis connection established"),
        Err(e) => warn!(
            error = %e,
            "Redis unavailable at startup, continuing without the shared token cache"
        ),
    }

    let token_manager = TokenManager::new(config.token_manager_config(), Arc::new(token_store))
        .map_err(|e| {
            error!(error = %e, "Failed to create TokenManager");
            GisError::from(e)
        })?;

    let gis_client = GisClient::new(token_manager, config.http_timeout)?;
    let endpoints = GisEndpoints::new(&config.map_server_url, &config.location_service_url);
    let gis_service = GisService::new(gis_client, endpoints);

    let shutdown_token = CancellationToken::new();

    // Start health HTTP server (MUST succeed - fail startup if it doesn't)
    let health_addr: SocketAddr = config.health_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.health_bind_address, "Invalid health bind address");
        GisError::Config(format!("Invalid health bind address: {e}"))
    })?;

    // Bind listener BEFORE spawning to fail fast on bind errors
    let health_listener = TcpListener::bind(health_addr).await.map_err(|e| {
        error!(error = %e, addr = %health_addr, "Failed to bind health server");
        format!("Failed to bind health server to {health_addr}: {e}")
    })?;

    let health_shutdown_token = shutdown_token.child_token();
    let app = health_router(Arc::clone(&health_state));
    let health_task = tokio::spawn(async move {
        info!(addr = %health_addr, "Health server starting");
        let server = axum::serve(health_listener, app).with_graceful_shutdown(async move {
            health_shutdown_token.cancelled().await;
            info!("Health server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Health server failed");
        }
    });

    // Start gRPC server
    let grpc_addr: SocketAddr = config.grpc_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.grpc_bind_address, "Invalid gRPC bind address");
        GisError::Config(format!("Invalid gRPC bind address: {e}"))
    })?;

    let grpc_listener = TcpListener::bind(grpc_addr).await.map_err(|e| {
        error!(error = %e, addr = %grpc_addr, "Failed to bind gRPC server");
        format!("Failed to bind gRPC server to {grpc_addr}: {e}")
    })?;

    let reflection = reflection_service()?;

    let grpc_shutdown_token = shutdown_token.child_token();
    let grpc_server = tonic::transport::Server::builder()
        .layer(TraceLayer::new_for_grpc())
        .add_service(MadinaGisServiceServer::new(gis_service))
        .add_service(reflection)
        .serve_with_incoming_shutdown(TcpListenerStream::new(grpc_listener), async move {
            grpc_shutdown_token.cancelled().await;
            info!("gRPC server shutting down");
        });

    // Trigger graceful shutdown on signal
    let signal_health = Arc::clone(&health_state);
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, initiating graceful shutdown...");
        // Mark as not ready immediately so load balancers stop sending traffic
        signal_health.set_not_ready();
        signal_token.cancel();
    });

    health_state.set_ready();
    info!(addr = %grpc_addr, "gRPC server started - press Ctrl+C to shutdown");

    let grpc_result = grpc_server.await;

    // The gRPC server may also stop on its own; make sure the health server follows.
    health_state.set_not_ready();
    shutdown_token.cancel();
    if let Err(e) = health_task.await {
        warn!(error = %e, "Health server task failed to join");
    }

    grpc_result.map_err(|e| {
        error!(error = %e, "gRPC server failed");
        e
    })?;

    info!("Madinah GIS Gateway shutdown complete");

    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
