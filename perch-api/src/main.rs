use std::net::SocketAddr;
use std::sync::Arc;

use perch_api::{
    app,
    state::{AppState, AuthConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "perch_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = perch_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Perch API on port {}", config.server.port);

    let db = perch_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let feed = perch_store::ChangeFeed::new();
    let desks: Arc<dyn perch_core::DeskRepository> = Arc::new(
        perch_store::StoreDeskRepository::new(db.pool.clone(), feed.clone()),
    );
    let bookings: Arc<dyn perch_core::BookingRepository> = Arc::new(
        perch_store::StoreBookingRepository::new(db.pool.clone(), feed.clone()),
    );

    let app_state = AppState::new(
        desks,
        bookings,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        config.business_rules.hold_ttl_seconds,
    );

    // Abandoned holds are only ever reclaimed by this sweeper or by the
    // pre-read sweep, so it runs for the lifetime of the process.
    tokio::spawn(perch_api::worker::start_hold_sweeper(
        app_state.coordinator.clone(),
        config.business_rules.sweep_interval_seconds,
    ));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
