//! Meetlink Server - booking-link scheduling
//!
//! REST API server for availability, booking and host assignment.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meetlink_server::{
    api,
    config::{AppConfig, StoreBackend},
    models::calendar::WorkingWindow,
    repository::{memory::MemoryStore, Repository, SchedulingStore},
    scheduling::StandardWorkingHours,
    services::{
        bookings::BookingService,
        clock::{Clock, SystemClock},
        history::HistoryLog,
        notifications::{EmailNotifier, LogNotifier, Notifier},
        Collaborators, Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("meetlink_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Meetlink Server v{}", env!("CARGO_PKG_VERSION"));

    let (store, history): (Arc<dyn SchedulingStore>, Arc<dyn HistoryLog>) = match config.database.backend {
        StoreBackend::Postgres => {
            // Create database connection pool
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            tracing::info!("Database migrations completed");

            let repository = Arc::new(Repository::new(pool));
            let store: Arc<dyn SchedulingStore> = repository.clone();
            let history: Arc<dyn HistoryLog> = repository;
            (store, history)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store: data is lost on restart");
            let memory = Arc::new(MemoryStore::new());
            let store: Arc<dyn SchedulingStore> = memory.clone();
            let history: Arc<dyn HistoryLog> = memory;
            (store, history)
        }
    };

    let notifier: Arc<dyn Notifier> = if config.email.enabled {
        Arc::new(EmailNotifier::new(config.email.clone()))
    } else {
        tracing::info!("Email disabled, notifications are only logged");
        Arc::new(LogNotifier)
    };

    let (workday_start, workday_end) = config.scheduling.workday_bounds()?;
    let working_hours = StandardWorkingHours::weekdays(WorkingWindow::new(workday_start, workday_end));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let services = Services::new(
        Collaborators {
            store,
            working_hours: Arc::new(working_hours),
            notifier,
            history,
            clock: clock.clone(),
        },
        &config.scheduling,
    );

    if config.scheduling.reminder_poll_seconds > 0 {
        tokio::spawn(run_reminders(
            services.bookings.clone(),
            clock,
            Duration::from_secs(config.scheduling.reminder_poll_seconds),
        ));
    }

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = api::create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().context("Invalid host address")?,
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically send reminders that have come due
async fn run_reminders(bookings: BookingService, clock: Arc<dyn Clock>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        match bookings.dispatch_due_reminders(clock.now()).await {
            Ok(_) => {}
            Err(e) if e.is_not_provisioned() => {
                tracing::debug!("Reminder store not provisioned: {}", e);
            }
            Err(e) => tracing::error!("Reminder dispatch failed: {}", e),
        }
    }
}
