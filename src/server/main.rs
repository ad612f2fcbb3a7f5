// src/server/main.rs
// Entry point for the celebration site API server
use celebration_site::common::{models::Collection, seed};
use celebration_site::server::{config::ServerConfig, database::Database, routes::build_router, state::AppState};
use celebration_site::utils::{logger::SiteLogger, performance};
use log::{error, info};
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();
    SiteLogger::init(&config.log_level);

    let database = Database::connect(&config.database_url).await?;

    // Run database migrations to create tables if they don't exist
    info!("🗄️ Running database migrations...");
    database.migrate().await.map_err(|e| {
        error!("Database migration failed: {}", e);
        e
    })?;
    info!("✅ Database migrations completed successfully");

    if config.seed_demo_data {
        for collection in Collection::ALL {
            database.seed_if_empty(collection, seed::records(collection)).await?;
        }
    }

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Start stats logger in background
    let stats_db = database.clone();
    let stats_path = config.stats_log_path.clone();
    let interval = Duration::from_secs(config.stats_interval_secs.max(1));
    tokio::spawn(async move {
        info!("📊 Starting stats logger - logging every {:?} to: {}", interval, stats_path);
        performance::start_stats_logger(stats_db, &stats_path, interval).await;
    });

    let addr = config.bind_addr();
    let state = AppState::new(database, config)?;
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("[SERVER] Listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
