//! Aniparty server entry point.

use std::sync::Arc;

use axum::Router;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aniparty_api::{AppState, router as api_router};
use aniparty_common::{Config, RoomCodeGenerator};
use aniparty_core::{
    ChatService, GuestIdentityProvider, IdentityService, PollEngine, ReactionService,
    SessionRegistry,
    store::{CommentStoreHandle, PollStoreHandle, ReactionStoreHandle, memory::MemoryStore},
};
use aniparty_db::repositories::{CommentRepository, PollRepository, ReactionRepository};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
#[allow(clippy::expect_used)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aniparty=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting aniparty server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to the database when one is configured; fall back to
    // the in-memory store otherwise (development and demos).
    let (comment_store, reaction_store, poll_store): (
        CommentStoreHandle,
        ReactionStoreHandle,
        PollStoreHandle,
    ) = if let Some(database) = &config.database {
        let db = aniparty_db::init(database).await?;
        info!("Connected to database");

        info!("Running database migrations...");
        aniparty_db::migrate(&db).await?;
        info!("Migrations completed");

        let db = Arc::new(db);
        (
            Arc::new(CommentRepository::new(Arc::clone(&db))),
            Arc::new(ReactionRepository::new(Arc::clone(&db))),
            Arc::new(PollRepository::new(Arc::clone(&db))),
        )
    } else {
        warn!("No database configured, persisting to memory only");
        let store = Arc::new(MemoryStore::new());
        (store.clone(), store.clone(), store)
    };

    // Wire up the live engine
    let registry = Arc::new(SessionRegistry::new(
        RoomCodeGenerator::new(config.party.room_code_length),
        config.party.sync_heartbeat_secs,
    ));
    let chat_service = Arc::new(ChatService::new(registry.clone(), comment_store.clone()));
    let reaction_service = Arc::new(ReactionService::new(registry.clone(), reaction_store));
    let poll_engine = Arc::new(PollEngine::new(poll_store));
    let identity_service: IdentityService = Arc::new(GuestIdentityProvider::new());

    let state = AppState {
        registry,
        chat_service,
        reaction_service,
        poll_engine,
        comment_store,
        identity_service,
    };

    let app = Router::new()
        .nest("/api", api_router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}
