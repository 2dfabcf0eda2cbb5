use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{
    Client, ClientId, NewClient, NewOrderItem, NewProduct, Order, OrderHeader, OrderId, OrderItem,
    OrderItemId, OrdersByClient, Product, ProductId, Result, StoreError,
    store::{NewOrder, Store, UnitOfWork},
};

#[derive(Debug, Clone)]
struct StoredItem {
    id: OrderItemId,
    order_id: OrderId,
    item: NewOrderItem,
    line_amount: Decimal,
}

#[derive(Debug, Clone, Default)]
struct State {
    clients: BTreeMap<ClientId, Client>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, OrderHeader>,
    items: BTreeMap<OrderItemId, StoredItem>,
    orders_by_client: BTreeMap<ClientId, Decimal>,
    last_client_id: i64,
    last_product_id: i64,
    last_order_id: i64,
    last_item_id: i64,
}

impl State {
    fn client(&self, id: ClientId) -> Result<&Client> {
        self.clients
            .get(&id)
            .ok_or_else(|| StoreError::not_found("client", id))
    }

    fn product(&self, id: ProductId) -> Result<&Product> {
        self.products
            .get(&id)
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    fn header(&self, id: OrderId) -> Result<&OrderHeader> {
        self.orders
            .get(&id)
            .ok_or_else(|| StoreError::not_found("order", id))
    }

    fn hydrate_item(&self, stored: &StoredItem) -> Result<OrderItem> {
        Ok(OrderItem {
            id: stored.id,
            order_id: stored.order_id,
            product_id: stored.item.product_id,
            product: self.product(stored.item.product_id)?.clone(),
            quantity: stored.item.quantity,
            price: stored.item.price,
            line_amount: stored.line_amount,
        })
    }

    fn hydrate_order(&self, header: &OrderHeader) -> Result<Order> {
        let items = self
            .items
            .values()
            .filter(|stored| stored.order_id == header.id)
            .map(|stored| self.hydrate_item(stored))
            .collect::<Result<Vec<_>>>()?;
        let client = self.client(header.client_id)?.clone();
        Ok(Order::from_parts(header.clone(), client, items))
    }

    /// Hydrates the matching orders, most recently created first.
    fn orders_where(&self, keep: impl Fn(&OrderHeader) -> bool) -> Result<Vec<Order>> {
        let mut headers: Vec<&OrderHeader> = self.orders.values().filter(|&h| keep(h)).collect();
        headers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        headers
            .into_iter()
            .map(|header| self.hydrate_order(header))
            .collect()
    }

    fn sum_row(&self, client_id: ClientId, sum: Decimal) -> Result<OrdersByClient> {
        Ok(OrdersByClient {
            client_id,
            client: self.client(client_id)?.clone(),
            orders_sum: sum,
        })
    }

    fn ensure_unique_number(&self, number: &str, except: Option<OrderId>) -> Result<()> {
        let taken = self
            .orders
            .values()
            .any(|h| h.number == number && Some(h.id) != except);
        if taken {
            return Err(StoreError::Conflict(
                "order number already exists".to_string(),
            ));
        }
        Ok(())
    }
}

/// In-memory store implementation for testing and database-less runs.
///
/// The whole state sits behind one lock. A unit of work holds the write lock
/// for its lifetime and mutates a private copy that replaces the shared state
/// on commit, so units of work are fully serialized and an uncommitted one
/// leaves no trace.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the total number of order items stored.
    pub async fn item_count(&self) -> usize {
        self.state.read().await.items.len()
    }

    /// Clears all rows.
    pub async fn clear(&self) {
        *self.state.write().await = State::default();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx> {
        let guard = self.state.clone().write_owned().await;
        let working = guard.clone();
        Ok(InMemoryUnitOfWork { guard, working })
    }

    async fn create_client(&self, client: &NewClient) -> Result<Client> {
        let mut state = self.state.write().await;
        state.last_client_id += 1;
        let created = Client {
            id: ClientId::new(state.last_client_id),
            name: client.name.clone(),
            tax_id: client.tax_id.clone(),
        };
        state.clients.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_client(&self, id: ClientId) -> Result<Client> {
        self.state.read().await.client(id).cloned()
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let state = self.state.read().await;
        let mut clients: Vec<Client> = state.clients.values().cloned().collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(clients)
    }

    async fn update_client(&self, id: ClientId, client: &NewClient) -> Result<Client> {
        let mut state = self.state.write().await;
        let stored = state
            .clients
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("client", id))?;
        stored.name = client.name.clone();
        stored.tax_id = client.tax_id.clone();
        Ok(stored.clone())
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product> {
        let mut state = self.state.write().await;
        state.last_product_id += 1;
        let created = Product {
            id: ProductId::new(state.last_product_id),
            name: product.name.clone(),
            unit: product.unit.clone(),
        };
        state.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.state.read().await.product(id).cloned()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn update_product(&self, id: ProductId, product: &NewProduct) -> Result<Product> {
        let mut state = self.state.write().await;
        let stored = state
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("product", id))?;
        stored.name = product.name.clone();
        stored.unit = product.unit.clone();
        Ok(stored.clone())
    }

    async fn get_order(&self, id: OrderId) -> Result<Order> {
        let state = self.state.read().await;
        state.hydrate_order(state.header(id)?)
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        self.state.read().await.orders_where(|_| true)
    }

    async fn list_client_orders(&self, client_id: ClientId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        state.client(client_id)?;
        state.orders_where(|header| header.client_id == client_id)
    }

    async fn list_product_order_items(&self, product_id: ProductId) -> Result<Vec<OrderItem>> {
        let state = self.state.read().await;
        state.product(product_id)?;

        let mut items = state
            .items
            .values()
            .filter(|stored| stored.item.product_id == product_id)
            .map(|stored| state.hydrate_item(stored))
            .collect::<Result<Vec<_>>>()?;
        items.sort_by_key(|item| (item.order_id, item.id));
        Ok(items)
    }

    async fn get_orders_by_client(&self, client_id: ClientId) -> Result<OrdersByClient> {
        let state = self.state.read().await;
        let sum = state
            .orders_by_client
            .get(&client_id)
            .copied()
            .ok_or_else(|| StoreError::not_found("orders by client", client_id))?;
        state.sum_row(client_id, sum)
    }

    async fn list_orders_by_client(&self) -> Result<Vec<OrdersByClient>> {
        let state = self.state.read().await;
        let mut sums = state
            .orders_by_client
            .iter()
            .map(|(client_id, sum)| state.sum_row(*client_id, *sum))
            .collect::<Result<Vec<_>>>()?;
        sums.sort_by(|a, b| {
            b.orders_sum
                .cmp(&a.orders_sum)
                .then(a.client_id.cmp(&b.client_id))
        });
        Ok(sums)
    }
}

/// Exclusive access to the in-memory state plus a working copy.
pub struct InMemoryUnitOfWork {
    guard: OwnedRwLockWriteGuard<State>,
    working: State,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn lock_order(&mut self, id: OrderId) -> Result<OrderHeader> {
        self.working.header(id).cloned()
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderHeader> {
        let state = &mut self.working;
        if !state.clients.contains_key(&order.client_id) {
            return Err(StoreError::Conflict(format!(
                "referential integrity violated: client {} does not exist",
                order.client_id
            )));
        }
        state.ensure_unique_number(&order.number, None)?;

        state.last_order_id += 1;
        let now = Utc::now();
        let header = OrderHeader {
            id: OrderId::new(state.last_order_id),
            client_id: order.client_id,
            date: order.date.unwrap_or(now),
            number: order.number.clone(),
            total_amount: Decimal::ZERO,
            is_confirmed: false,
            created_at: now,
        };
        state.orders.insert(header.id, header.clone());
        Ok(header)
    }

    async fn update_order_header(
        &mut self,
        id: OrderId,
        client_id: ClientId,
        number: &str,
    ) -> Result<()> {
        let state = &mut self.working;
        if !state.clients.contains_key(&client_id) {
            return Err(StoreError::Conflict(format!(
                "referential integrity violated: client {client_id} does not exist"
            )));
        }
        state.ensure_unique_number(number, Some(id))?;

        let header = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("order", id))?;
        header.client_id = client_id;
        header.number = number.to_string();
        Ok(())
    }

    async fn insert_item(
        &mut self,
        order_id: OrderId,
        item: &NewOrderItem,
        line_amount: Decimal,
    ) -> Result<OrderItemId> {
        let state = &mut self.working;
        if !state.orders.contains_key(&order_id) || !state.products.contains_key(&item.product_id)
        {
            return Err(StoreError::Conflict(format!(
                "referential integrity violated: order {order_id} or product {} does not exist",
                item.product_id
            )));
        }

        state.last_item_id += 1;
        let id = OrderItemId::new(state.last_item_id);
        state.items.insert(
            id,
            StoredItem {
                id,
                order_id,
                item: item.clone(),
                line_amount,
            },
        );
        Ok(id)
    }

    async fn delete_items(&mut self, order_id: OrderId) -> Result<u64> {
        let before = self.working.items.len();
        self.working
            .items
            .retain(|_, stored| stored.order_id != order_id);
        Ok((before - self.working.items.len()) as u64)
    }

    async fn count_items(&mut self, order_id: OrderId) -> Result<i64> {
        let count = self
            .working
            .items
            .values()
            .filter(|stored| stored.order_id == order_id)
            .count();
        Ok(count as i64)
    }

    async fn recompute_total(&mut self, order_id: OrderId) -> Result<Decimal> {
        let state = &mut self.working;
        let total = state
            .items
            .values()
            .filter(|stored| stored.order_id == order_id)
            .try_fold(Decimal::ZERO, |total, stored| {
                total.checked_add(stored.line_amount)
            })
            .ok_or(StoreError::Overflow("order total"))?;
        let header = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;
        header.total_amount = total;
        Ok(total)
    }

    async fn set_confirmed(&mut self, order_id: OrderId) -> Result<()> {
        let header = self
            .working
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;
        header.is_confirmed = true;
        Ok(())
    }

    async fn delete_order(&mut self, order_id: OrderId) -> Result<()> {
        let state = &mut self.working;
        state
            .orders
            .remove(&order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;
        state.items.retain(|_, stored| stored.order_id != order_id);
        Ok(())
    }

    async fn add_to_orders_sum(&mut self, client_id: ClientId, delta: Decimal) -> Result<Decimal> {
        let state = &mut self.working;
        if !state.clients.contains_key(&client_id) {
            return Err(StoreError::Conflict(format!(
                "referential integrity violated: client {client_id} does not exist"
            )));
        }
        let sum = state
            .orders_by_client
            .entry(client_id)
            .or_insert(Decimal::ZERO);
        *sum = sum
            .checked_add(delta)
            .ok_or(StoreError::Overflow("orders by client sum"))?;
        Ok(*sum)
    }

    async fn ensure_client(&mut self, id: ClientId) -> Result<()> {
        self.working.client(id).map(|_| ())
    }

    async fn ensure_product(&mut self, id: ProductId) -> Result<()> {
        self.working.product(id).map(|_| ())
    }

    async fn lock_client(&mut self, id: ClientId) -> Result<Client> {
        self.working.client(id).cloned()
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<Product> {
        self.working.product(id).cloned()
    }

    async fn client_has_orders(&mut self, id: ClientId) -> Result<bool> {
        Ok(self.working.orders.values().any(|h| h.client_id == id))
    }

    async fn product_has_order_items(&mut self, id: ProductId) -> Result<bool> {
        Ok(self
            .working
            .items
            .values()
            .any(|stored| stored.item.product_id == id))
    }

    async fn delete_client(&mut self, id: ClientId) -> Result<()> {
        let state = &mut self.working;
        if state.orders.values().any(|h| h.client_id == id) {
            return Err(StoreError::Conflict(format!(
                "referential integrity violated: client {id} is referenced by orders"
            )));
        }
        state
            .clients
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("client", id))?;
        state.orders_by_client.remove(&id);
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<()> {
        let state = &mut self.working;
        if state.items.values().any(|stored| stored.item.product_id == id) {
            return Err(StoreError::Conflict(format!(
                "referential integrity violated: product {id} is referenced by order items"
            )));
        }
        state
            .products
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("product", id))?;
        Ok(())
    }

    async fn load_order(&mut self, id: OrderId) -> Result<Order> {
        let header = self.working.header(id)?;
        self.working.hydrate_order(header)
    }

    async fn commit(self) -> Result<()> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}
