use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Client, ClientId, NewClient, NewOrderItem, NewProduct, Order, OrderHeader, OrderId, OrderItem,
    OrderItemId, OrdersByClient, Product, ProductId, Result, StoreError,
    store::{NewOrder, Store, UnitOfWork},
};

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.client_id, o.date, o.number, o.total_amount, o.is_confirmed, o.created_at,
           c.name AS client_name, c.tax_id AS client_tax_id
    FROM orders o
    JOIN clients c ON c.id = o.client_id
"#;

const ORDERS_BY_CLIENT_SELECT: &str = r#"
    SELECT obc.client_id, obc.orders_sum, c.name AS client_name, c.tax_id AS client_tax_id
    FROM orders_by_client obc
    JOIN clients c ON c.id = obc.client_id
"#;

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the tables if they do not exist yet.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database schema is up to date");
        Ok(())
    }
}

fn row_to_client(row: &PgRow) -> Result<Client> {
    Ok(Client {
        id: ClientId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        tax_id: row.try_get("tax_id")?,
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        unit: row.try_get("unit")?,
    })
}

fn row_to_header(row: &PgRow) -> Result<OrderHeader> {
    Ok(OrderHeader {
        id: OrderId::new(row.try_get("id")?),
        client_id: ClientId::new(row.try_get("client_id")?),
        date: row.try_get("date")?,
        number: row.try_get("number")?,
        total_amount: row.try_get("total_amount")?,
        is_confirmed: row.try_get("is_confirmed")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Maps a row of [`ORDER_SELECT`] to the header and its client.
fn row_to_order_parts(row: &PgRow) -> Result<(OrderHeader, Client)> {
    let header = row_to_header(row)?;
    let client = Client {
        id: header.client_id,
        name: row.try_get("client_name")?,
        tax_id: row.try_get("client_tax_id")?,
    };
    Ok((header, client))
}

fn row_to_item(row: &PgRow) -> Result<OrderItem> {
    let product_id = ProductId::new(row.try_get("product_id")?);
    Ok(OrderItem {
        id: OrderItemId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        product_id,
        product: Product {
            id: product_id,
            name: row.try_get("product_name")?,
            unit: row.try_get("product_unit")?,
        },
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
        line_amount: row.try_get("line_amount")?,
    })
}

fn row_to_orders_by_client(row: &PgRow) -> Result<OrdersByClient> {
    let client_id = ClientId::new(row.try_get("client_id")?);
    Ok(OrdersByClient {
        client_id,
        client: Client {
            id: client_id,
            name: row.try_get("client_name")?,
            tax_id: row.try_get("client_tax_id")?,
        },
        orders_sum: row.try_get("orders_sum")?,
    })
}

/// Translates constraint violations into store-level conflicts.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.constraint() == Some("orders_number_key") {
            tracing::debug!(error = %db_err, "unique order number violated");
            return StoreError::Conflict("order number already exists".to_string());
        }
        if db_err.is_foreign_key_violation() {
            tracing::debug!(error = %db_err, "foreign key violated");
            return StoreError::Conflict(format!("referential integrity violated: {db_err}"));
        }
    }
    StoreError::Database(err)
}

async fn fetch_items(conn: &mut PgConnection, order_ids: &[i64]) -> Result<Vec<OrderItem>> {
    let rows = sqlx::query(
        r#"
        SELECT i.id, i.order_id, i.product_id, i.quantity, i.price, i.line_amount,
               p.name AS product_name, p.unit AS product_unit
        FROM order_items i
        JOIN products p ON p.id = i.product_id
        WHERE i.order_id = ANY($1)
        ORDER BY i.order_id ASC, i.id ASC
        "#,
    )
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_item).collect()
}

/// Attaches items to order rows, keeping the row order.
async fn hydrate_orders(conn: &mut PgConnection, rows: Vec<PgRow>) -> Result<Vec<Order>> {
    let parts = rows
        .iter()
        .map(row_to_order_parts)
        .collect::<Result<Vec<_>>>()?;
    if parts.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = parts.iter().map(|(header, _)| header.id.as_i64()).collect();
    let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for item in fetch_items(conn, &ids).await? {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    Ok(parts
        .into_iter()
        .map(|(header, client)| {
            let items = items_by_order.remove(&header.id).unwrap_or_default();
            Order::from_parts(header, client, items)
        })
        .collect())
}

async fn fetch_order(conn: &mut PgConnection, id: OrderId) -> Result<Order> {
    let sql = format!("{ORDER_SELECT} WHERE o.id = $1");
    let row = sqlx::query(&sql)
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::not_found("order", id))?;

    let (header, client) = row_to_order_parts(&row)?;
    let items = fetch_items(conn, &[header.id.as_i64()]).await?;
    Ok(Order::from_parts(header, client, items))
}

async fn fetch_client(conn: &mut PgConnection, id: ClientId) -> Result<Client> {
    let row = sqlx::query("SELECT id, name, tax_id FROM clients WHERE id = $1")
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::not_found("client", id))?;
    row_to_client(&row)
}

async fn fetch_product(conn: &mut PgConnection, id: ProductId) -> Result<Product> {
    let row = sqlx::query("SELECT id, name, unit FROM products WHERE id = $1")
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::not_found("product", id))?;
    row_to_product(&row)
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PostgresUnitOfWork { tx })
    }

    async fn create_client(&self, client: &NewClient) -> Result<Client> {
        let row = sqlx::query(
            "INSERT INTO clients (name, tax_id) VALUES ($1, $2) RETURNING id, name, tax_id",
        )
        .bind(&client.name)
        .bind(&client.tax_id)
        .fetch_one(&self.pool)
        .await?;
        row_to_client(&row)
    }

    async fn get_client(&self, id: ClientId) -> Result<Client> {
        let mut conn = self.pool.acquire().await?;
        fetch_client(&mut conn, id).await
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let rows = sqlx::query("SELECT id, name, tax_id FROM clients ORDER BY name ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_client).collect()
    }

    async fn update_client(&self, id: ClientId, client: &NewClient) -> Result<Client> {
        let row = sqlx::query(
            "UPDATE clients SET name = $1, tax_id = $2 WHERE id = $3 RETURNING id, name, tax_id",
        )
        .bind(&client.name)
        .bind(&client.tax_id)
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("client", id))?;
        row_to_client(&row)
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product> {
        let row =
            sqlx::query("INSERT INTO products (name, unit) VALUES ($1, $2) RETURNING id, name, unit")
                .bind(&product.name)
                .bind(&product.unit)
                .fetch_one(&self.pool)
                .await?;
        row_to_product(&row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT id, name, unit FROM products ORDER BY name ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn update_product(&self, id: ProductId, product: &NewProduct) -> Result<Product> {
        let row = sqlx::query(
            "UPDATE products SET name = $1, unit = $2 WHERE id = $3 RETURNING id, name, unit",
        )
        .bind(&product.name)
        .bind(&product.unit)
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("product", id))?;
        row_to_product(&row)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("{ORDER_SELECT} ORDER BY o.created_at DESC, o.id DESC");
        let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
        hydrate_orders(&mut conn, rows).await
    }

    async fn list_client_orders(&self, client_id: ClientId) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_client(&mut conn, client_id).await?;

        let sql =
            format!("{ORDER_SELECT} WHERE o.client_id = $1 ORDER BY o.created_at DESC, o.id DESC");
        let rows = sqlx::query(&sql)
            .bind(client_id.as_i64())
            .fetch_all(&mut *conn)
            .await?;
        hydrate_orders(&mut conn, rows).await
    }

    async fn list_product_order_items(&self, product_id: ProductId) -> Result<Vec<OrderItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, product_id).await?;

        let rows = sqlx::query(
            r#"
            SELECT i.id, i.order_id, i.product_id, i.quantity, i.price, i.line_amount,
                   p.name AS product_name, p.unit AS product_unit
            FROM order_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.product_id = $1
            ORDER BY i.order_id ASC, i.id ASC
            "#,
        )
        .bind(product_id.as_i64())
        .fetch_all(&mut *conn)
        .await?;
        rows.iter().map(row_to_item).collect()
    }

    async fn get_orders_by_client(&self, client_id: ClientId) -> Result<OrdersByClient> {
        let sql = format!("{ORDERS_BY_CLIENT_SELECT} WHERE obc.client_id = $1");
        let row = sqlx::query(&sql)
            .bind(client_id.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("orders by client", client_id))?;
        row_to_orders_by_client(&row)
    }

    async fn list_orders_by_client(&self) -> Result<Vec<OrdersByClient>> {
        let sql =
            format!("{ORDERS_BY_CLIENT_SELECT} ORDER BY obc.orders_sum DESC, obc.client_id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_orders_by_client).collect()
    }
}

/// A PostgreSQL transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn lock_order(&mut self, id: OrderId) -> Result<OrderHeader> {
        let row = sqlx::query(
            r#"
            SELECT id, client_id, date, number, total_amount, is_confirmed, created_at
            FROM orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::not_found("order", id))?;
        row_to_header(&row)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderHeader> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (client_id, date, number, total_amount, is_confirmed)
            VALUES ($1, COALESCE($2, CURRENT_TIMESTAMP), $3, 0, false)
            RETURNING id, client_id, date, number, total_amount, is_confirmed, created_at
            "#,
        )
        .bind(order.client_id.as_i64())
        .bind(order.date)
        .bind(&order.number)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        row_to_header(&row)
    }

    async fn update_order_header(
        &mut self,
        id: OrderId,
        client_id: ClientId,
        number: &str,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET client_id = $1, number = $2 WHERE id = $3")
            .bind(client_id.as_i64())
            .bind(number)
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }

    async fn insert_item(
        &mut self,
        order_id: OrderId,
        item: &NewOrderItem,
        line_amount: Decimal,
    ) -> Result<OrderItemId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price, line_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(order_id.as_i64())
        .bind(item.product_id.as_i64())
        .bind(item.quantity)
        .bind(item.price)
        .bind(line_amount)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        Ok(OrderItemId::new(id))
    }

    async fn delete_items(&mut self, order_id: OrderId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_items(&mut self, order_id: OrderId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
            .bind(order_id.as_i64())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn recompute_total(&mut self, order_id: OrderId) -> Result<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE orders
            SET total_amount = (
                SELECT COALESCE(SUM(line_amount), 0)
                FROM order_items
                WHERE order_id = $1
            )
            WHERE id = $1
            RETURNING total_amount
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;
        total.ok_or_else(|| StoreError::not_found("order", order_id))
    }

    async fn set_confirmed(&mut self, order_id: OrderId) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET is_confirmed = true WHERE id = $1")
            .bind(order_id.as_i64())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", order_id));
        }
        Ok(())
    }

    async fn delete_order(&mut self, order_id: OrderId) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_i64())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", order_id));
        }
        Ok(())
    }

    async fn add_to_orders_sum(&mut self, client_id: ClientId, delta: Decimal) -> Result<Decimal> {
        let sum: Decimal = sqlx::query_scalar(
            r#"
            INSERT INTO orders_by_client (client_id, orders_sum)
            VALUES ($1, $2)
            ON CONFLICT (client_id)
            DO UPDATE SET orders_sum = orders_by_client.orders_sum + EXCLUDED.orders_sum
            RETURNING orders_sum
            "#,
        )
        .bind(client_id.as_i64())
        .bind(delta)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        Ok(sum)
    }

    async fn ensure_client(&mut self, id: ClientId) -> Result<()> {
        sqlx::query("SELECT 1 FROM clients WHERE id = $1 FOR KEY SHARE")
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StoreError::not_found("client", id))?;
        Ok(())
    }

    async fn ensure_product(&mut self, id: ProductId) -> Result<()> {
        sqlx::query("SELECT 1 FROM products WHERE id = $1 FOR KEY SHARE")
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StoreError::not_found("product", id))?;
        Ok(())
    }

    async fn lock_client(&mut self, id: ClientId) -> Result<Client> {
        let row = sqlx::query("SELECT id, name, tax_id FROM clients WHERE id = $1 FOR UPDATE")
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StoreError::not_found("client", id))?;
        row_to_client(&row)
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<Product> {
        let row = sqlx::query("SELECT id, name, unit FROM products WHERE id = $1 FOR UPDATE")
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StoreError::not_found("product", id))?;
        row_to_product(&row)
    }

    async fn client_has_orders(&mut self, id: ClientId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE client_id = $1)")
                .bind(id.as_i64())
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn product_has_order_items(&mut self, id: ProductId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
                .bind(id.as_i64())
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn delete_client(&mut self, id: ClientId) -> Result<()> {
        // orders_by_client rows cascade with the client
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("client", id));
        }
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", id));
        }
        Ok(())
    }

    async fn load_order(&mut self, id: OrderId) -> Result<Order> {
        fetch_order(&mut self.tx, id).await
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
