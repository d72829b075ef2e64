#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod catalog;
mod certificates;
mod config;
mod enrollment;
mod error;
mod models;
mod progress;
mod reports;
mod telemetry;
#[cfg(test)]
mod test;

use api::{
    api_admin_enroll, api_admin_overview, api_admin_revenue, api_enroll_self,
    api_generate_certificate, api_get_certificate, api_get_course, api_get_course_progress,
    api_get_overall_progress, api_list_courses, api_list_enrollments, api_mark_lesson_complete,
    api_payment_webhook, api_verify_certificate, health,
};
use auth::unauthorized_api;
use config::AppConfig;
use error::AppError;
use rocket::{Build, Rocket};
use telemetry::{TelemetryFairing, init_tracing};
use thiserror::Error;

use sqlx::SqlitePool;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Figment(rocket::figment::Error),
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

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

#[launch]
async fn rocket() -> _ {
    init_tracing();

    if let Err(e) = config::load_environment() {
        tracing::warn!("Failed to load environment files: {}", e);
    }

    let database_url = std::env::var("DATABASE_URL").unwrap_or_default();

    let pool = SqlitePool::connect(&database_url)
        .await
        .expect("Failed to connect to SQLite database");

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(_) => info!("Migrations completed successfully"),
        Err(e) => {
            tracing::error!("Failed to run migrations: {}", e);
            panic!("Database migration failed: {}", e);
        }
    }

    init_rocket(pool, AppConfig::from_env()).await
}

pub async fn init_rocket(pool: SqlitePool, config: AppConfig) -> Rocket<Build> {
    info!("Starting course tracker");

    rocket::build()
        .manage(pool)
        .manage(config)
        .mount(
            "/api",
            routes![
                api_list_courses,
                api_get_course,
                api_enroll_self,
                api_payment_webhook,
                api_admin_enroll,
                api_list_enrollments,
                api_mark_lesson_complete,
                api_get_course_progress,
                api_get_overall_progress,
                api_generate_certificate,
                api_get_certificate,
                api_verify_certificate,
                api_admin_overview,
                api_admin_revenue,
            ],
        )
        .register("/api", catchers![unauthorized_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
}
