use std::net::SocketAddr;
use std::sync::Arc;

use ortis_api::{app, state::{AppState, AuthConfig}};
use ortis_order::TransitionPolicy;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ortis_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ortis_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Ortis API on port {}", config.server.port);

    let db = ortis_store::DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let policy = if config.workflow.guarded_transitions {
        TransitionPolicy::Guarded
    } else {
        TransitionPolicy::Permissive
    };
    tracing::info!(?policy, "Transition policy configured");

    let app_state = AppState {
        cases: Arc::new(ortis_store::StoreCaseRepository::new(db.pool.clone())),
        orders: Arc::new(ortis_store::StoreOrderRepository::new(db.pool.clone())),
        invoices: Arc::new(ortis_store::StoreInvoiceRepository::new(db.pool.clone())),
        warehouse: Arc::new(ortis_store::StoreWarehouseRepository::new(db.pool.clone())),
        dictionaries: Arc::new(ortis_store::StoreDictionaryRepository::new(db.pool.clone())),
        users: Arc::new(ortis_store::StoreUserRepository::new(db.pool.clone())),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        policy,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
