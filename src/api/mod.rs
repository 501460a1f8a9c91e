//! HTTP surface of the ledger.
//!
//! One router exposes every transaction type as a collection (`/donations`,
//! `/expenses`, ...). Every handler runs its store work through [`AppState::run`] so a
//! stuck query fails fast, and the request watchdog bounds the request as a whole.

pub mod error;
pub mod handlers;
pub mod middleware;

use crate::{config::AppConfig, core::with_query_timeout, errors::Result};
use axum::{Router, middleware::from_fn_with_state, routing::get};
use sea_orm::DatabaseConnection;
use std::{future::Future, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub database: DatabaseConnection,
    /// Limit applied to each store operation
    pub query_timeout: Duration,
    /// Limit applied to each request by the watchdog
    pub request_timeout: Duration,
}

impl AppState {
    /// Builds the state from a connected pool and the loaded configuration.
    #[must_use]
    pub fn new(database: DatabaseConnection, config: &AppConfig) -> Self {
        Self {
            database,
            query_timeout: config.database.query_timeout(),
            request_timeout: config.server.request_timeout(),
        }
    }

    /// Runs a store operation under the query timeout.
    pub async fn run<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_query_timeout(self.query_timeout, operation).await
    }
}

/// Builds the application router with tracing and the request watchdog applied.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/:collection",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/:collection/next-receipt-number",
            get(handlers::next_receipt_number),
        )
        .route(
            "/:collection/:id",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(
                    state.clone(),
                    middleware::request_watchdog,
                )),
        )
        .with_state(state)
}
