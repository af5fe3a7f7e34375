//! Food-ordering cart and checkout service

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use food_checkout::config::Config;
use food_checkout::http::{router, AppState};
use food_checkout::services::{EventPublisher, ReceiptStorage};
use food_checkout::store::memory::MemoryStore;
use food_checkout::store::postgres::{self, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    let events = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => EventPublisher::nats(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, order events disabled");
                EventPublisher::disabled()
            }
        },
        None => EventPublisher::disabled(),
    };
    let receipts = ReceiptStorage::new(&config.upload_dir);

    let app = match &config.database_url {
        Some(url) => {
            let pool = postgres::connect(url, config.max_connections).await.context("connecting to PostgreSQL")?;
            sqlx::migrate!("./migrations").run(&pool).await.context("running migrations")?;
            router(AppState::new(PgStore::new(pool), receipts, events))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            router(AppState::new(MemoryStore::new(), receipts, events))
        }
    };
    let app: Router = app.layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    let addr = config.socket_addr();
    tracing::info!(%addr, "Food checkout listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
