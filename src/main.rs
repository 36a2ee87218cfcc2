#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod db;
mod env;
mod error;
mod fixtures;
mod models;
mod reports;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use api::api_routes;
use auth::{forbidden_api, not_found_api, unauthorized_api, unprocessable_api};
use db::{clean_expired_sessions, ensure_bootstrap_admin};
use env::{AppConfig, load_environment};
use error::AppError;
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use telemetry::{TelemetryFairing, init_tracing};
use thiserror::Error;
use tracing::{error, info};

const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    load_environment()?;
    let config = AppConfig::from_env()?;
    let _otel_guard = init_tracing(config.otlp_endpoint.as_deref());

    let pool = SqlitePool::connect(&config.database_url).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(AppError::from)?;
    info!("Migrations completed successfully");

    if let Some(admin) = &config.bootstrap_admin {
        if ensure_bootstrap_admin(&pool, &admin.email, &admin.password).await? {
            info!(email = %admin.email, "Bootstrap administrator created");
        }
    }

    spawn_session_cleanup(pool.clone());

    init_rocket(pool, config).launch().await?;
    Ok(())
}

fn spawn_session_cleanup(pool: SqlitePool) {
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(
                SESSION_CLEANUP_INTERVAL_SECS,
            ))
            .await;
        }
    });
}

pub fn init_rocket(pool: SqlitePool, config: AppConfig) -> Rocket<Build> {
    info!("Starting football tracker");

    rocket::build()
        .manage(pool)
        .manage(config)
        .mount("/api", api_routes())
        .register(
            "/api",
            catchers![
                unauthorized_api,
                forbidden_api,
                not_found_api,
                unprocessable_api
            ],
        )
        .attach(TelemetryFairing)
}
