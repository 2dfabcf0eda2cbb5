//! HTTP API server with observability for the order management backend.
//!
//! Provides REST endpoints for clients, products, orders and the per-client
//! confirmed order sums, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the application state with every service sharing `store`.
pub fn create_state<S: Store + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}

/// Creates the Axum application router with all routes and shared state.
///
/// Requests running longer than `request_timeout` are answered with
/// 408 and their in-flight unit of work is dropped, which rolls it back.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    request_timeout: Duration,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route(
            "/clients",
            get(routes::clients::list::<S>).post(routes::clients::create::<S>),
        )
        .route(
            "/clients/{id}",
            get(routes::clients::get::<S>)
                .put(routes::clients::update::<S>)
                .delete(routes::clients::delete::<S>),
        )
        .route("/clients/{id}/orders", get(routes::clients::orders::<S>))
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route(
            "/products/{id}/order-items",
            get(routes::products::order_items::<S>),
        )
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .put(routes::orders::update::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .route("/orders/{id}/confirm", post(routes::orders::confirm::<S>))
        .route(
            "/orders-by-client",
            get(routes::orders_by_client::list::<S>),
        )
        .route(
            "/orders-by-client/{client_id}",
            get(routes::orders_by_client::get::<S>),
        )
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api", api)
        .merge(metrics_router)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
