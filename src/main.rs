use std::net::TcpListener;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use enroll_auth::auth::SystemClock;
use enroll_auth::configuration::get_configuration;
use enroll_auth::error::{AppError, ErrorHandler};
use enroll_auth::startup::{run, Services};
use enroll_auth::store::{PgAccountStore, PgSessionStore};
use enroll_auth::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Structured logging
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        let error = AppError::from(e);
        error.log_error("startup");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, error.to_string())
    })?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
        })?;

    tracing::info!("Database ready");

    let services = Services::new(
        configuration.auth.clone(),
        Arc::new(SystemClock),
        Arc::new(PgSessionStore::new(pool.clone())),
        Arc::new(PgAccountStore::new(pool)),
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, services)?.await
}
