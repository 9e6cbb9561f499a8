pub mod authz;
pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    cache::CacheService,
    config::{Config, PaymentConfig},
    database::Database,
    redis_client::RedisClient,
    services::{
        identity::{IdentityVerifier, JwksVerifier},
        payment::{CheckoutGatewayClient, PaymentGateway},
        reconciliation::Reconciler,
    },
    store::{PgStore, Store},
};

// Shared state for every handler
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub reconciler: Reconciler,
    pub cache: CacheService,
    pub payment: PaymentConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityVerifier>,
        gateway: Arc<dyn PaymentGateway>,
        cache: CacheService,
        payment: PaymentConfig,
    ) -> Arc<Self> {
        let reconciler = Reconciler::new(store.clone(), gateway.clone());
        Arc::new(Self {
            store,
            identity,
            gateway,
            reconciler,
            cache,
            payment,
        })
    }

    /// Wires the production collaborators: Postgres (migrated), optional
    /// Redis, the JWKS verifier and the checkout gateway client.
    pub async fn connect(config: &Config) -> anyhow::Result<Arc<Self>> {
        let db = Database::connect(&config.database).await?;
        db.migrate().await?;

        let cache = match &config.redis.url {
            Some(url) => match RedisClient::new(url).await {
                Ok(redis) => {
                    info!("Redis connected");
                    CacheService::new(redis, config.redis.catalog_ttl_seconds)
                }
                Err(e) => {
                    warn!("Redis unavailable, catalog cache disabled: {}", e);
                    CacheService::disabled()
                }
            },
            None => CacheService::disabled(),
        };

        let identity = JwksVerifier::new(&config.identity)?;
        let gateway = CheckoutGatewayClient::new(&config.payment, &config.circuit_breaker)?;

        Ok(Self::new(
            Arc::new(PgStore::new(db)),
            Arc::new(identity),
            Arc::new(gateway),
            cache,
            config.payment.clone(),
        ))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Ticket market API is running" }))
        .route("/health", get(|| async { "OK" }))
        .merge(controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
