// /learnhub-lms/services/payments-service/src/main.rs

mod api;
mod core;
mod middleware;
mod models;
mod repository;
mod utils;

use axum::{middleware as axum_middleware, Router};
use sqlx::postgres::PgPoolOptions;
use std::{env, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api::routes,
    core::{CheckoutService, DodoClient, ReconciliationEngine},
    middleware::{auth_middleware, rate_limit_middleware, RateLimiter},
    repository::Repository,
};

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<Repository>,
    pub engine: Arc<ReconciliationEngine>,
    pub checkout: Arc<CheckoutService>,
    pub rate_limiter: Arc<RateLimiter>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    utils::logger::init_logger();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Setup database connection pool
    let database_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL harus di-set di environment");

    let pool = PgPoolOptions::new()
        .max_connections(
            env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        )
        .acquire_timeout(Duration::from_secs(
            env::var("DATABASE_ACQUIRE_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
        ))
        .connect(&database_url)
        .await?;

    // Test database connection
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .expect("Gagal ping database");

    info!("✅ Database berhasil terkoneksi");

    // Run pending migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Initialize repository layer
    let repository = Arc::new(Repository::new(pool.clone()));

    // Payment gateway client
    let gateway = Arc::new(DodoClient::new().expect("Gagal initialize Dodo client"));

    // Reconciliation engine: dipakai verify, webhook, dan admin approval
    let engine = Arc::new(ReconciliationEngine::new(
        repository.transactions.clone(),
        repository.enrollments.clone(),
        repository.records.clone(),
        gateway,
    ));

    // Checkout service
    let checkout = Arc::new(CheckoutService::new(
        repository.transactions.clone(),
        repository.promos.clone(),
        repository.courses.clone(),
        repository.records.clone(),
    ));

    // Initialize rate limiter
    let rate_limiter = Arc::new(RateLimiter::new(
        env::var("RATE_LIMIT_MAX_REQUESTS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100),
        env::var("RATE_LIMIT_WINDOW_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60),
    ));

    // Create application state
    let app_state = AppState {
        repository,
        engine,
        checkout,
        rate_limiter,
    };

    // Setup CORS
    let cors = utils::cors::create_cors_layer();

    // Build application dengan middleware stack
    let app = Router::new()
        // Mount API routes
        .merge(routes::create_routes())
        // Health check endpoint
        .route("/health", axum::routing::get(health_check))
        // Apply state first
        .with_state(app_state.clone())
        // Then apply middlewares
        .layer(
            ServiceBuilder::new()
                // Request tracing (paling luar)
                .layer(TraceLayer::new_for_http())
                // Timeout protection
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                // CORS handling
                .layer(cors),
        )
        // Security headers
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        // Rate limiting
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            rate_limit_middleware,
        ))
        // Auth (JWT lokal, tidak perlu state)
        .layer(axum_middleware::from_fn(auth_middleware));

    // Server configuration
    let port = env::var("PAYMENTS_SERVICE_PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .unwrap_or_else(|_| "3004".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    // Print startup information
    utils::banner::print_startup_banner(&bind_address);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("🚀 Payments Service berjalan di {}", bind_address);

    axum::serve(listener, app).await.map_err(|e| e.into())
}

// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "service": "payments-service",
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "features": {
            "dodo_gateway": true,
            "webhook_processing": true,
            "payment_verification": true,
            "manual_payments": true,
            "promo_codes": true,
            "rate_limiting": true,
            "security_headers": true
        },
        "environment": env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    }))
}
