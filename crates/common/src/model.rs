//! Entity records shared by the store, the domain services and the HTTP layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ClientId, OrderId, OrderItemId, ProductId};

/// A customer that places orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Tax identification number.
    pub tax_id: String,
}

/// Fields accepted when creating or updating a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub tax_id: String,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit of measure (e.g. `pcs`, `kg`).
    pub unit: String,
}

/// Fields accepted when creating or updating a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub unit: String,
}

/// The `orders` row without its hydrated relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeader {
    pub id: OrderId,
    pub client_id: ClientId,
    pub date: DateTime<Utc>,
    pub number: String,
    pub total_amount: Decimal,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// A fully hydrated order: header, owning client and line items with products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_id: ClientId,
    pub client: Client,
    pub date: DateTime<Utc>,
    pub number: String,
    pub total_amount: Decimal,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Assembles a hydrated order from its parts.
    pub fn from_parts(header: OrderHeader, client: Client, items: Vec<OrderItem>) -> Self {
        Self {
            id: header.id,
            client_id: header.client_id,
            client,
            date: header.date,
            number: header.number,
            total_amount: header.total_amount,
            is_confirmed: header.is_confirmed,
            created_at: header.created_at,
            items,
        }
    }

    /// Sum of the line amounts of all items.
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(|item| item.line_amount).sum()
    }
}

/// A line item of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product: Product,
    pub quantity: Decimal,
    pub price: Decimal,
    pub line_amount: Decimal,
}

/// A line item as supplied by a caller, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl NewOrderItem {
    pub fn new(product_id: ProductId, quantity: Decimal, price: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            price,
        }
    }

    /// `quantity × price`, exact, or `None` if the product does not fit in a
    /// `Decimal`.
    pub fn line_amount(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.price)
    }
}

/// Running sum of a client's confirmed order totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdersByClient {
    pub client_id: ClientId,
    pub client: Client,
    pub orders_sum: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(id: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            unit: "pcs".to_string(),
        }
    }

    fn item(id: i64, quantity: Decimal, price: Decimal) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(id),
            order_id: OrderId::new(1),
            product_id: ProductId::new(id),
            product: product(id),
            quantity,
            price,
            line_amount: quantity * price,
        }
    }

    #[test]
    fn line_amount_is_exact_product() {
        let item = NewOrderItem::new(ProductId::new(1), dec!(1.333), dec!(0.03));
        assert_eq!(item.line_amount(), Some(dec!(0.03999)));
    }

    #[test]
    fn line_amount_overflow_is_none() {
        let item = NewOrderItem::new(ProductId::new(1), Decimal::MAX, dec!(2));
        assert_eq!(item.line_amount(), None);
    }

    #[test]
    fn items_total_sums_line_amounts() {
        let now = Utc::now();
        let header = OrderHeader {
            id: OrderId::new(1),
            client_id: ClientId::new(1),
            date: now,
            number: "A-1".to_string(),
            total_amount: dec!(25.00),
            is_confirmed: false,
            created_at: now,
        };
        let client = Client {
            id: ClientId::new(1),
            name: "Acme".to_string(),
            tax_id: String::new(),
        };
        let order = Order::from_parts(
            header,
            client,
            vec![item(1, dec!(2), dec!(10.00)), item(2, dec!(1), dec!(5.00))],
        );

        assert_eq!(order.items_total(), dec!(25.00));
        assert_eq!(order.total_amount, order.items_total());
    }

    #[test]
    fn new_client_tax_id_defaults_to_empty() {
        let client: NewClient = serde_json::from_str(r#"{"name":"Acme"}"#).unwrap();
        assert_eq!(client.name, "Acme");
        assert!(client.tax_id.is_empty());
    }
}
