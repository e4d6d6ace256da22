//! Rental engine maintenance entry point
//!
//! Applies migrations, checks that every backing service is reachable and
//! reports the admin rejection queue.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rental_engine::{
    config::AppConfig,
    repository::{BookingStore, Repository},
    services::{
        cache::{AvailabilityCache, MemoryAvailabilityCache},
        notifications::EmailNotificationService,
        payment::HttpPaymentProcessor,
        redis::RedisService,
        Services,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rental_engine={},sqlx=warn", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }

    tracing::info!("Starting rental engine v{}", env!("CARGO_PKG_VERSION"));

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

    let cache: Arc<dyn AvailabilityCache> = if config.redis.enabled {
        let redis = RedisService::new(&config.redis.url)
            .await
            .context("Failed to connect to Redis")?;
        tracing::info!("Connected to Redis");
        Arc::new(redis)
    } else {
        tracing::info!("Redis disabled, using in-process availability cache");
        Arc::new(MemoryAvailabilityCache::new())
    };

    let payments = HttpPaymentProcessor::new(config.payment.clone())
        .context("Failed to create payment client")?;
    if !payments.is_configured() {
        tracing::warn!("Payment API key is not set, holds will be declined");
    }

    let store: Arc<dyn BookingStore> = Arc::new(Repository::new(pool));
    let notifier = EmailNotificationService::new(config.email.clone(), config.booking.lang, store.clone());

    let services = Services::new(store, cache, Arc::new(payments), Arc::new(notifier), &config);

    let pending = services
        .rejections
        .list_unresolved()
        .await
        .context("Failed to read the rejection queue")?;
    if pending.is_empty() {
        tracing::info!("No rejection awaiting admin review");
    } else {
        tracing::info!("{} rejection(s) awaiting admin review", pending.len());
        for record in &pending {
            tracing::info!(
                "Rejection {} of reservation {} by host {}: {}",
                record.id,
                record.rent_id,
                record.host_id,
                record.reason_code
            );
        }
    }

    Ok(())
}
