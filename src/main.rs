//! Maintrack Server - equipment assignment coordinator
//!
//! REST API server assigning equipment to projects.

use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maintrack_server::{
    api,
    config::{AppConfig, LoggingConfig, StorageBackend},
    repository::{
        memory::{Fixtures, MemoryStore},
        Repository,
    },
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config.logging);

    tracing::info!("Starting Maintrack Server v{}", env!("CARGO_PKG_VERSION"));

    let services = match config.storage.backend {
        StorageBackend::Postgres => {
            // Create database connection pool
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await?;

            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("./migrations").run(&pool).await?;

            tracing::info!("Database migrations completed");

            Services::new(Arc::new(Repository::new(pool)))
        }
        StorageBackend::Memory => {
            let fixtures = match config.storage.fixtures {
                Some(ref path) => Fixtures::from_file(path)?,
                None => Fixtures::default(),
            };
            tracing::warn!(
                "Using in-memory storage ({} equipment, {} projects); assignments are lost on exit",
                fixtures.equipment.len(),
                fixtures.projects.len()
            );
            Services::new(Arc::new(MemoryStore::new(fixtures)))
        }
    };

    // Save server address before moving config
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("maintrack_server={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
