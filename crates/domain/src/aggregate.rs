//! Per-client running sum of confirmed order totals.
//!
//! The sum is never recomputed from the orders table. It moves only by
//! signed deltas applied inside the unit of work that confirms or deletes an
//! order, so it is exactly as consistent as the orders themselves.

use common::{ClientId, OrdersByClient};
use rust_decimal::Decimal;
use store::{Store, UnitOfWork};

use crate::error::DomainError;

/// Adds `delta` to the client's confirmed-order sum and returns the new sum.
///
/// The store performs this as one upsert-with-increment, so concurrent
/// deltas for the same client cannot overwrite each other. A client without
/// a row yet gets one holding `delta`.
pub async fn apply_delta<T: UnitOfWork>(
    tx: &mut T,
    client_id: ClientId,
    delta: Decimal,
) -> Result<Decimal, DomainError> {
    let sum = tx.add_to_orders_sum(client_id, delta).await?;
    metrics::counter!("orders_by_client_deltas_total").increment(1);
    tracing::debug!(%client_id, %delta, %sum, "orders-by-client delta applied");
    Ok(sum)
}

/// Read access to the per-client sums.
#[derive(Clone)]
pub struct OrdersByClientService<S: Store> {
    store: S,
}

impl<S: Store> OrdersByClientService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Fails with `NotFound` if no order of the client was ever confirmed.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, client_id: ClientId) -> Result<OrdersByClient, DomainError> {
        Ok(self.store.get_orders_by_client(client_id).await?)
    }

    /// Lists all sums, largest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<OrdersByClient>, DomainError> {
        Ok(self.store.list_orders_by_client().await?)
    }
}
