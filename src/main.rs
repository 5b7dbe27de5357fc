//! Fund Ledger Service - Main Application Entry Point
//!
//! This is a REST API server for managing government fund accounts, a
//! ledger of disbursement/collection transactions against those accounts,
//! and the override workflow that lets a recorded transaction be corrected
//! only through reviewer approval.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: stateless bearer JWT (HS256)
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::auth::TokenVerifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Token verification is stateless; the verifier is the auth
    // middleware's only state
    let verifier = TokenVerifier::new(&config.jwt_secret);

    // Create authenticated routes (API endpoints)
    let authenticated_routes = Router::new()
        // Fund account routes
        .route(
            "/api/v1/fund-accounts",
            post(handlers::fund_accounts::create_fund_account),
        )
        .route(
            "/api/v1/fund-accounts",
            get(handlers::fund_accounts::list_fund_accounts),
        )
        .route(
            "/api/v1/fund-accounts/{id}",
            get(handlers::fund_accounts::get_fund_account),
        )
        .route(
            "/api/v1/fund-accounts/{id}/audit",
            get(handlers::fund_accounts::audit_fund_account),
        )
        // Transaction routes
        .route(
            "/api/v1/transactions",
            post(handlers::transactions::create_transaction),
        )
        .route(
            "/api/v1/transactions",
            get(handlers::transactions::list_transactions),
        )
        .route(
            "/api/v1/transactions/{id}",
            get(handlers::transactions::get_transaction),
        )
        // Override workflow routes
        .route(
            "/api/v1/overrides",
            post(handlers::overrides::propose_override),
        )
        .route("/api/v1/overrides", get(handlers::overrides::list_overrides))
        .route(
            "/api/v1/overrides/{id}/approve",
            post(handlers::overrides::approve_override),
        )
        .route(
            "/api/v1/overrides/{id}/reject",
            post(handlers::overrides::reject_override),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            verifier,
            middleware::auth::auth_middleware,
        ));

    // Combine authenticated routes with public routes
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share database pool with all handlers via State extraction
        .with_state(pool);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
