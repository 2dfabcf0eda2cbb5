//! HTTP handlers, grouped by resource.

pub mod clients;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod orders_by_client;
pub mod products;

use domain::{ClientService, OrderService, OrdersByClientService, ProductService};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub order_service: OrderService<S>,
    pub client_service: ClientService<S>,
    pub product_service: ProductService<S>,
    pub orders_by_client_service: OrdersByClientService<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Builds every service on top of one store.
    pub fn new(store: S) -> Self {
        Self {
            order_service: OrderService::new(store.clone()),
            client_service: ClientService::new(store.clone()),
            product_service: ProductService::new(store.clone()),
            orders_by_client_service: OrdersByClientService::new(store),
        }
    }
}

/// Parses a positive integer path segment into a typed ID.
pub(crate) fn parse_id<T: From<i64>>(id: &str) -> Result<T, ApiError> {
    match id.parse::<i64>() {
        Ok(value) if value > 0 => Ok(T::from(value)),
        _ => Err(ApiError::BadRequest(format!("Invalid ID format: {id}"))),
    }
}
