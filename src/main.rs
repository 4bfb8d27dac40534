use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use courtbook::config::AppConfig;
use courtbook::db;
use courtbook::handlers;
use courtbook::services::notify::resend::ResendEmailProvider;
use courtbook::services::notify::{LogNotifier, NotificationProvider};
use courtbook::services::sweeper;
use courtbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let notifier: Box<dyn NotificationProvider> = if config.resend_api_key.is_empty() {
        tracing::info!("no email API key configured, logging notifications instead");
        Box::new(LogNotifier)
    } else {
        tracing::info!("using Resend email notifications (from: {})", config.notify_from_email);
        Box::new(ResendEmailProvider::new(
            config.resend_api_key.clone(),
            config.notify_from_email.clone(),
        ))
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        notifier,
    });

    sweeper::spawn_periodic(Arc::clone(&state), config.sweep_interval_secs);

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/courts", get(handlers::courts::list_courts))
        .route("/api/courts/:id", get(handlers::courts::get_court))
        .route("/api/availability", get(handlers::availability::get_availability))
        .route(
            "/api/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::get_my_bookings),
        )
        .route("/api/bookings/:id", get(handlers::bookings::get_my_booking))
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/payment",
            post(handlers::bookings::attach_payment_reference),
        )
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route(
            "/api/admin/bookings/:id/verify",
            post(handlers::admin::verify_booking),
        )
        .route(
            "/api/admin/bookings/:id/complete",
            post(handlers::admin::complete_booking),
        )
        .route("/api/admin/payments", get(handlers::admin::get_payments))
        .route("/api/admin/courts", post(handlers::admin::create_court))
        .route("/api/admin/courts/:id", post(handlers::admin::update_court))
        .route("/api/admin/sweep", post(handlers::admin::run_sweep))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
