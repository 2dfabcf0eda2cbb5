use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    Client, ClientId, NewClient, NewOrderItem, NewProduct, Order, OrderHeader, OrderId, OrderItem,
    OrderItemId, OrdersByClient, Product, ProductId, Result,
};

/// Header fields of an order about to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: ClientId,
    pub number: String,
    /// Order date; the store uses the current time when absent.
    pub date: Option<DateTime<Utc>>,
}

/// Core trait for store implementations.
///
/// Reads and single-row writes go straight through the store. Anything that
/// touches more than one row runs inside a [`UnitOfWork`] obtained from
/// [`Store::begin`]. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// The unit of work type handed out by [`Store::begin`].
    type Tx: UnitOfWork;

    /// Opens a new unit of work.
    ///
    /// Nothing written through it is visible to other callers until
    /// [`UnitOfWork::commit`] succeeds. Dropping it without committing
    /// discards every write.
    async fn begin(&self) -> Result<Self::Tx>;

    async fn create_client(&self, client: &NewClient) -> Result<Client>;

    async fn get_client(&self, id: ClientId) -> Result<Client>;

    /// Lists clients ordered by name, then id.
    async fn list_clients(&self) -> Result<Vec<Client>>;

    async fn update_client(&self, id: ClientId, client: &NewClient) -> Result<Client>;

    async fn create_product(&self, product: &NewProduct) -> Result<Product>;

    async fn get_product(&self, id: ProductId) -> Result<Product>;

    /// Lists products ordered by name, then id.
    async fn list_products(&self) -> Result<Vec<Product>>;

    async fn update_product(&self, id: ProductId, product: &NewProduct) -> Result<Product>;

    /// Fetches an order together with its client and its items with products.
    async fn get_order(&self, id: OrderId) -> Result<Order>;

    /// Lists all orders, most recently created first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Lists the orders of one client, most recently created first.
    ///
    /// Fails with `NotFound` if the client does not exist.
    async fn list_client_orders(&self, client_id: ClientId) -> Result<Vec<Order>>;

    /// Lists every order item that references a product.
    ///
    /// Fails with `NotFound` if the product does not exist.
    async fn list_product_order_items(&self, product_id: ProductId) -> Result<Vec<OrderItem>>;

    /// Fetches the confirmed-order sum of a client.
    async fn get_orders_by_client(&self, client_id: ClientId) -> Result<OrdersByClient>;

    /// Lists all per-client sums, largest first.
    async fn list_orders_by_client(&self) -> Result<Vec<OrdersByClient>>;
}

/// A scoped, all-or-nothing sequence of writes.
///
/// Every step runs against the same isolated view of the store. The writes
/// become visible only through [`UnitOfWork::commit`]; on drop without commit
/// they are rolled back.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Fetches an order header and locks the row until the unit of work ends.
    async fn lock_order(&mut self, id: OrderId) -> Result<OrderHeader>;

    /// Inserts an order header with a zero total, unconfirmed.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderHeader>;

    /// Replaces the client reference and number of an order.
    async fn update_order_header(
        &mut self,
        id: OrderId,
        client_id: ClientId,
        number: &str,
    ) -> Result<()>;

    /// Inserts one line item with an already computed line amount.
    async fn insert_item(
        &mut self,
        order_id: OrderId,
        item: &NewOrderItem,
        line_amount: Decimal,
    ) -> Result<OrderItemId>;

    /// Deletes every item of an order, returning how many were removed.
    async fn delete_items(&mut self, order_id: OrderId) -> Result<u64>;

    async fn count_items(&mut self, order_id: OrderId) -> Result<i64>;

    /// Sets `total_amount` to the sum of the stored line amounts and returns it.
    async fn recompute_total(&mut self, order_id: OrderId) -> Result<Decimal>;

    async fn set_confirmed(&mut self, order_id: OrderId) -> Result<()>;

    /// Deletes an order; its items go with it.
    async fn delete_order(&mut self, order_id: OrderId) -> Result<()>;

    /// Adds a signed amount to a client's confirmed-order sum, creating the
    /// row on first use. Returns the resulting sum.
    async fn add_to_orders_sum(&mut self, client_id: ClientId, delta: Decimal) -> Result<Decimal>;

    /// Fails with `NotFound` unless the client exists; keeps it from being
    /// deleted until the unit of work ends.
    async fn ensure_client(&mut self, id: ClientId) -> Result<()>;

    /// Fails with `NotFound` unless the product exists; keeps it from being
    /// deleted until the unit of work ends.
    async fn ensure_product(&mut self, id: ProductId) -> Result<()>;

    /// Fetches a client and locks the row for deletion.
    async fn lock_client(&mut self, id: ClientId) -> Result<Client>;

    /// Fetches a product and locks the row for deletion.
    async fn lock_product(&mut self, id: ProductId) -> Result<Product>;

    async fn client_has_orders(&mut self, id: ClientId) -> Result<bool>;

    async fn product_has_order_items(&mut self, id: ProductId) -> Result<bool>;

    /// Deletes a client together with its confirmed-order sum row.
    async fn delete_client(&mut self, id: ClientId) -> Result<()>;

    async fn delete_product(&mut self, id: ProductId) -> Result<()>;

    /// Fetches a hydrated order as seen by this unit of work.
    async fn load_order(&mut self, id: OrderId) -> Result<Order>;

    /// Makes every write of this unit of work visible at once.
    async fn commit(self) -> Result<()>;
}
