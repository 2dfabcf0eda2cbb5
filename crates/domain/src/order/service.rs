//! Order service driving the order lifecycle against a store.

use common::{ClientId, NewOrderItem, Order, OrderId};
use rust_decimal::Decimal;
use store::{NewOrder, Store, UnitOfWork};

use crate::aggregate::apply_delta;
use crate::error::{DomainError, required};

use super::commands::validate_items;
use super::{CreateOrder, OrderError, UpdateOrder};

/// Service for managing orders.
///
/// Every state-changing method runs as one unit of work: the store sees
/// either all of its writes or none of them.
#[derive(Clone)]
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an order with its items and returns it hydrated.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        validate_items(&cmd.items)?;
        let number = required("order number", &cmd.number)?;

        let mut tx = self.store.begin().await?;
        tx.ensure_client(cmd.client_id).await?;
        let header = tx
            .insert_order(&NewOrder {
                client_id: cmd.client_id,
                number,
                date: cmd.date,
            })
            .await?;
        let total = write_items(&mut tx, header.id, &cmd.items).await?;
        let order = tx.load_order(header.id).await?;
        tx.commit().await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, %total, items = order.items.len(), "order created");
        Ok(order)
    }

    /// Edits an unconfirmed order and returns it hydrated.
    #[tracing::instrument(skip(self))]
    pub async fn update_order(
        &self,
        order_id: OrderId,
        cmd: UpdateOrder,
    ) -> Result<Order, DomainError> {
        let mut tx = self.store.begin().await?;
        let current = tx.lock_order(order_id).await?;
        if current.is_confirmed {
            return Err(OrderError::ConfirmedImmutable { order_id }.into());
        }

        let items = cmd.items.filter(|items| !items.is_empty());
        if let Some(items) = &items {
            validate_items(items)?;
        }
        let number = match cmd.number.as_deref() {
            Some(number) => required("order number", number)?,
            None => current.number,
        };
        let client_id = cmd.client_id.unwrap_or(current.client_id);
        if client_id != current.client_id {
            tx.ensure_client(client_id).await?;
        }

        tx.update_order_header(order_id, client_id, &number).await?;
        if let Some(items) = &items {
            let removed = tx.delete_items(order_id).await?;
            let total = write_items(&mut tx, order_id, items).await?;
            tracing::debug!(%order_id, removed, added = items.len(), %total, "order items replaced");
        }
        let order = tx.load_order(order_id).await?;
        tx.commit().await?;

        tracing::info!(%order_id, "order updated");
        Ok(order)
    }

    /// Confirms an order and folds its total into the client's sum.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let mut tx = self.store.begin().await?;
        let header = tx.lock_order(order_id).await?;
        if header.is_confirmed {
            return Err(OrderError::AlreadyConfirmed { order_id }.into());
        }
        if tx.count_items(order_id).await? == 0 {
            return Err(OrderError::NoItems.into());
        }

        let sum = apply_delta(&mut tx, header.client_id, header.total_amount).await?;
        tx.set_confirmed(order_id).await?;
        let order = tx.load_order(order_id).await?;
        tx.commit().await?;

        metrics::counter!("orders_confirmed_total").increment(1);
        tracing::info!(
            %order_id,
            client_id = %header.client_id,
            total = %header.total_amount,
            orders_sum = %sum,
            "order confirmed"
        );
        Ok(order)
    }

    /// Deletes an order; a confirmed order's total is first taken back out of
    /// the client's sum.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        let header = tx.lock_order(order_id).await?;
        if header.is_confirmed {
            apply_delta(&mut tx, header.client_id, -header.total_amount).await?;
        }
        tx.delete_order(order_id).await?;
        tx.commit().await?;

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(%order_id, confirmed = header.is_confirmed, "order deleted");
        Ok(())
    }

    /// Loads a hydrated order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        Ok(self.store.get_order(order_id).await?)
    }

    /// Lists all orders, most recent first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders().await?)
    }

    /// Lists the orders of one client, most recent first.
    #[tracing::instrument(skip(self))]
    pub async fn list_client_orders(&self, client_id: ClientId) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_client_orders(client_id).await?)
    }
}

/// Inserts the items of an order and recomputes its total from them.
async fn write_items<T: UnitOfWork>(
    tx: &mut T,
    order_id: OrderId,
    items: &[NewOrderItem],
) -> Result<Decimal, DomainError> {
    for item in items {
        let line_amount = item.line_amount().ok_or(OrderError::AmountOutOfRange)?;
        tx.ensure_product(item.product_id).await?;
        tx.insert_item(order_id, item, line_amount).await?;
    }
    Ok(tx.recompute_total(order_id).await?)
}
