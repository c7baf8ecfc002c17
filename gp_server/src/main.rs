//! Casual-gaming portal server.
//!
//! Serves the portal REST API and the live event stream over WebSocket,
//! backed by PostgreSQL. Tournament brackets, game rooms, and player stats
//! live in the `game_portal` library; this binary wires the managers
//! together and exposes them over HTTP.

mod api;
mod config;
mod logging;
mod metrics;

use std::sync::Arc;

use anyhow::Error;
use config::ServerConfig;
use ctrlc::set_handler;
use game_portal::{
    auth::{AuthManager, LogMailer},
    db::Database,
    notify::Notifier,
    room::RoomManager,
    stats::StatsManager,
    tournament::TournamentManager,
};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run the casual-gaming portal server

USAGE:
  gp_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/game_portal]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND             Prometheus exporter bind address (optional)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (required)
  PASSWORD_PEPPER          Password hashing pepper (required)
  EVENT_CAPACITY           Portal event broadcast buffer size
  LEADERBOARD_LIMIT        Maximum leaderboard rows per request
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override = pargs.opt_value_from_str("--bind")?;
    let db_url_override = pargs.opt_value_from_str("--db-url")?;

    let config = ServerConfig::from_env(bind_override, db_url_override)
        .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();
    info!("Starting gaming portal server at {}", config.bind);

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(Error::msg)?;
        info!("Prometheus metrics available at http://{metrics_bind}/metrics");
    }

    // Initialize database
    info!("Connecting to database: {}", config.database.database_url);
    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    info!("Database connected successfully");

    // Create managers
    let pool = Arc::new(db.pool().clone());
    let notifier = Notifier::new(config.portal.event_capacity);
    let stats_manager = Arc::new(StatsManager::new(pool.clone()));
    let tournament_manager = Arc::new(TournamentManager::new(
        pool.clone(),
        stats_manager.clone(),
        notifier.clone(),
    ));
    let room_manager = Arc::new(RoomManager::new(
        pool.clone(),
        stats_manager.clone(),
        notifier.clone(),
    ));
    let auth_manager = Arc::new(AuthManager::new(
        pool.clone(),
        stats_manager.clone(),
        Arc::new(LogMailer),
        config.security.password_pepper.clone(),
        config.security.jwt_secret.clone(),
    ));

    // Create API state and router
    let api_state = api::AppState {
        auth_manager,
        tournament_manager,
        room_manager,
        stats_manager,
        notifier,
        pool,
        leaderboard_limit: config.portal.leaderboard_limit,
    };
    let app = api::create_router(api_state);

    // Start HTTP server
    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
