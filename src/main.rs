//! Library Server
//!
//! REST API for authors, books, members and loans, plus the background
//! workers that send loan notifications and overdue reminders.

use anyhow::Context;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_server::{
    api,
    config::AppConfig,
    jobs::{JobQueue, JobRegistry, RetryPolicy, Schedule, Scheduler, WorkerPool, CHECK_OVERDUE_LOANS},
    repository::{LoanStore, Repository},
    services::{email::EmailService, notifications::NotificationService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("library_server={},tower_http=debug", config.logging.level).into()
    });
    let json_logs = config.logging.format == "json";
    tracing_subscriber::registry()
        .with(filter)
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting Library Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let repository = Repository::new(pool);
    let loan_store: Arc<dyn LoanStore> = Arc::new(repository.loans.clone());
    let mailer = Arc::new(EmailService::new(config.email.clone())?);

    // Background jobs
    let (queue, receiver) = JobQueue::new(config.jobs.queue_capacity);
    let registry = Arc::new(JobRegistry::with_library_jobs());
    let notifications = NotificationService::new(loan_store.clone(), mailer)
        .with_send_timeout(Duration::from_secs(config.email.timeout_secs));
    WorkerPool::new(
        registry.clone(),
        notifications,
        RetryPolicy::from(&config.jobs),
    )
    .start(receiver, config.jobs.workers);

    let overdue_check = Schedule::daily(
        config.jobs.overdue_check_hour,
        config.jobs.overdue_check_minute,
    )?;
    Scheduler::new(queue.clone())
        .add(CHECK_OVERDUE_LOANS, overdue_check, Value::Null)
        .run();

    let services = Services::new(repository, loan_store, registry, queue);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::create_router(state);

    let addr = SocketAddr::new(
        server_host.parse().context("Invalid host address")?,
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
