//! Gateway server setup
//!
//! Provides the main WebSocket server configuration and routes.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::broadcast::{EventDispatcher, LocalTransport};
use crate::connection::ConnectionManager;
use axum::{extract::State, http::StatusCode, routing::get, Router};
use huddle_cache::{MemoryStore, Publisher, RedisPool, RedisStore, SharedStore, SubscriberConfig};
use huddle_common::{AppConfig, AppError, JwtService};
use huddle_core::Directory;
use huddle_db::PgDirectory;
use huddle_realtime::{RealtimeContext, RedisTransport, SharedTransport};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint; unhealthy while the ephemeral store is unreachable
async fn health_check(State(state): State<GatewayState>) -> (StatusCode, &'static str) {
    match state.realtime().store().ping().await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed, store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        }
    }
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
///
/// With Redis configured, state lives in Redis and events travel over Redis
/// Pub/Sub. Without it, the node keeps state in memory and delivers locally.
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    tracing::info!("Connecting to PostgreSQL...");
    let pool = huddle_db::create_pool(&config.database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");
    let directory: Arc<dyn Directory> = Arc::new(PgDirectory::new(pool));

    let connection_manager = ConnectionManager::new_shared();

    let (store, transport, event_dispatcher): (
        SharedStore,
        SharedTransport,
        Option<Arc<EventDispatcher>>,
    ) = match &config.redis {
        Some(redis) => {
            tracing::info!("Connecting to Redis...");
            let redis_pool =
                RedisPool::from_config(redis).map_err(|e| AppError::Cache(e.to_string()))?;
            let store = Arc::new(RedisStore::new(redis_pool.clone()));
            let transport = Arc::new(RedisTransport::new(Publisher::new(redis_pool)));

            let dispatcher = Arc::new(EventDispatcher::new(
                SubscriberConfig {
                    redis_url: redis.url.clone(),
                    ..Default::default()
                },
                connection_manager.clone(),
            ));
            dispatcher.clone().start();
            tracing::info!("Redis connection established");

            (store, transport, Some(dispatcher))
        }
        None => {
            tracing::warn!("REDIS_URL not set, running single-node with in-memory state");
            (
                Arc::new(MemoryStore::new()),
                Arc::new(LocalTransport::new(connection_manager.clone())),
                None,
            )
        }
    };

    let realtime = RealtimeContext::builder()
        .store(store)
        .directory(directory)
        .transport(transport)
        .presence(config.presence)
        .broadcast(config.broadcast)
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let jwt = JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry);

    Ok(GatewayState::new(
        realtime,
        jwt,
        connection_manager,
        event_dispatcher,
        config,
    ))
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let state = create_gateway_state(config).await?;
    let app = create_app(state);

    run_server(app, addr).await
}
