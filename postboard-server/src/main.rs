use anyhow::Context;
use postboard_server::{build_router, config, db, AppState};
use std::{net::SocketAddr, path::Path};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postboard_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load settings
    let settings = config::Settings::new().context("Failed to load settings")?;

    if !Path::new(&settings.database.path).exists() {
        tracing::warn!(
            "Database not found at {}; run postboard-import first to load posts",
            settings.database.path
        );
    }

    // Initialize database
    let db = db::Database::new(&settings.database.path).context("Failed to create database")?;
    db.initialize()
        .context("Failed to initialize database schema")?;
    tracing::info!("Database initialized: {}", settings.database.path);

    let app = build_router(AppState::new(db));

    // Start server
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Failed to parse server address")?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
