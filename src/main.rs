// src/main.rs

use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::EnvFilter;

mod categories; // Category CRUD
mod config; // Environment configuration
mod error; // StoreError / AppError
mod products; // Product CRUD
mod shared; // Response envelope and health check
mod store; // Store traits with Postgres and in-memory backends
mod transactions; // Checkout and daily summary

use config::{Config, ConfigError, StoreBackend};
use error::AppError;
use store::memory::MemoryStore;
use store::postgres::PgStore;
use store::Stores;
use transactions::transaction_service::TransactionService;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// State shared by every route.
pub struct AppState {
    pub stores: Stores,
    pub transactions: TransactionService,
    /// Deadline for store reads triggered by a request
    pub read_timeout: Duration,
}

impl AppState {
    pub fn new(stores: Stores, read_timeout: Duration) -> web::Data<Self> {
        let transactions = TransactionService::new(stores.transactions.clone());
        web::Data::new(AppState {
            stores,
            transactions,
            read_timeout,
        })
    }

    #[cfg(test)]
    pub fn for_backend<S>(backend: S) -> web::Data<Self>
    where
        S: store::ProductStore + store::CategoryStore + store::TransactionStore + 'static,
    {
        AppState::new(Stores::from_backend(backend), Duration::from_secs(3))
    }
}

/// Registers state, extractor error handlers and every route.
pub fn configure_app(state: web::Data<AppState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(state)
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::Validation(format!("invalid request body: {err}")).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                AppError::Validation(format!("invalid path parameter: {err}")).into()
            }))
            .service(shared::health_router::health)
            // Products
            .service(products::product_router::list_products)
            .service(products::product_router::get_product)
            .service(products::product_router::create_product)
            .service(products::product_router::update_product)
            .service(products::product_router::delete_product)
            // Categories
            .service(categories::category_router::list_categories)
            .service(categories::category_router::get_category)
            .service(categories::category_router::create_category)
            .service(categories::category_router::update_category)
            .service(categories::category_router::delete_category)
            // Checkout and reports
            .service(transactions::transaction_router::checkout)
            .service(transactions::transaction_router::get_transaction)
            .service(transactions::transaction_router::summary_today);
    }
}

async fn build_stores(config: &Config) -> Result<Stores, BoxError> {
    match config.backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;

            let store = PgStore::connect(database_url, &config.pool).await?;
            if config.run_migrations {
                store.migrate().await?;
                tracing::info!("database migrations applied");
            }
            Ok(Stores::from_backend(store))
        }
        StoreBackend::Memory => {
            let store = if config.seed_demo_data {
                MemoryStore::with_demo_data()
            } else {
                MemoryStore::new()
            };
            tracing::warn!("using the in-memory store, data is lost on restart");
            Ok(Stores::from_backend(store))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kasir=info,actix_web=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let stores = build_stores(&config).await?;
    let state = AppState::new(stores, config.read_timeout);

    let (host, port) = config.bind_address();
    tracing::info!(backend = ?config.backend, "starting kasir API on {host}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(configure_app(state.clone()))
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}
