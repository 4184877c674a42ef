use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier::{
    api::{create_router, AppState},
    config::Config,
    error::AppError,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,courier=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting Courier server v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Arc::new(Config::from_env()?);
    tracing::info!("✅ Configuration loaded");

    // Setup database with proper connection pooling
    let db = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    tracing::info!("✅ Database connected: {}", config.database_url);

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

    tracing::info!("✅ Database migrations completed");

    // Create shared application state
    let state = AppState {
        db,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Bind and serve
    let addr = config.server_address();
    tracing::info!("🌐 Server listening on http://{}", addr);
    tracing::info!("🏥 Health check: http://{}/api/health", addr);
    tracing::info!("");
    tracing::info!("📚 API Endpoints:");
    tracing::info!("  POST /api/auth/register       - Register new user");
    tracing::info!("  POST /api/auth/login          - Login with username/password");
    tracing::info!("  GET  /api/users               - List users (requires auth)");
    tracing::info!("  GET  /api/users/:u            - Get profile (same user only)");
    tracing::info!("  GET  /api/users/:u/to         - Messages to user (same user only)");
    tracing::info!("  GET  /api/users/:u/from       - Messages from user (same user only)");
    tracing::info!("  GET  /api/messages/:id        - Get message (sender or recipient)");
    tracing::info!("  POST /api/messages            - Send message (requires auth)");
    tracing::info!("  POST /api/messages/:id/read   - Mark read (recipient only)");
    tracing::info!("");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
