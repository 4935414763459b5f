use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinebook_api::{app, worker, AppState};
use cinebook_booking::{BookingStore, ExpirationSweeper, MockPaymentProvider};
use cinebook_catalog::CatalogStore;
use cinebook_core::invoice::StubInvoiceRenderer;
use cinebook_core::notify::NoopNotifier;
use cinebook_store::{DbClient, PgStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinebook_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cinebook_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Cinebook API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let store = Arc::new(PgStore::new(db.pool.clone()));
    let catalog: Arc<dyn CatalogStore> = store.clone();
    let bookings: Arc<dyn BookingStore> = store;

    let state = AppState::build(
        catalog,
        bookings.clone(),
        Arc::new(MockPaymentProvider),
        Arc::new(NoopNotifier),
        Arc::new(StubInvoiceRenderer),
        config.business_rules.currency.clone(),
    );

    let sweeper = Arc::new(ExpirationSweeper::new(
        bookings,
        chrono::Duration::seconds(config.business_rules.hold_deadline_seconds as i64),
    ));
    tokio::spawn(worker::start_expiration_worker(
        sweeper,
        Duration::from_secs(config.business_rules.sweep_interval_seconds),
    ));

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
