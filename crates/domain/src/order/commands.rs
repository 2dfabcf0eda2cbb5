//! Order commands.

use chrono::{DateTime, Utc};
use common::{ClientId, NewOrderItem};
use rust_decimal::Decimal;

use super::OrderError;

/// Fractional digits a quantity may carry.
pub(crate) const QUANTITY_SCALE: u32 = 3;

/// Fractional digits a unit price may carry.
pub(crate) const PRICE_SCALE: u32 = 2;

/// Exclusive upper bound of a quantity, the integer range of `NUMERIC(15,3)`.
pub(crate) const QUANTITY_LIMIT: i64 = 1_000_000_000_000;

/// Exclusive upper bound of a unit price, the integer range of `NUMERIC(15,2)`.
pub(crate) const PRICE_LIMIT: i64 = 10_000_000_000_000;

/// Command to create a new order together with its items.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The client placing the order.
    pub client_id: ClientId,

    /// Human-readable order number, unique across orders.
    pub number: String,

    /// Order date; defaults to the creation time.
    pub date: Option<DateTime<Utc>>,

    /// Line items; at least one is required.
    pub items: Vec<NewOrderItem>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command dated at creation time.
    pub fn new(client_id: ClientId, number: impl Into<String>, items: Vec<NewOrderItem>) -> Self {
        Self {
            client_id,
            number: number.into(),
            date: None,
            items,
        }
    }

    /// Sets an explicit order date.
    pub fn dated(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}

/// Command to edit an unconfirmed order.
///
/// Omitted header fields keep their stored values. When `items` is `None` or
/// empty the item set and the total are left untouched; otherwise the item
/// set is replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrder {
    pub client_id: Option<ClientId>,
    pub number: Option<String>,
    pub items: Option<Vec<NewOrderItem>>,
}

impl UpdateOrder {
    /// An update that changes nothing until fields are set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn items(mut self, items: Vec<NewOrderItem>) -> Self {
        self.items = Some(items);
        self
    }
}

/// Checks the item invariants shared by create and update.
pub(crate) fn validate_items(items: &[NewOrderItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }

    let mut total = Decimal::ZERO;
    for item in items {
        if !in_range(item.quantity, QUANTITY_LIMIT, QUANTITY_SCALE) {
            return Err(OrderError::InvalidQuantity {
                quantity: item.quantity,
            });
        }
        if !in_range(item.price, PRICE_LIMIT, PRICE_SCALE) {
            return Err(OrderError::InvalidPrice { price: item.price });
        }
        total = item
            .line_amount()
            .and_then(|amount| total.checked_add(amount))
            .ok_or(OrderError::AmountOutOfRange)?;
    }

    Ok(())
}

/// Positive, below `limit`, and with at most `scale` significant fractional
/// digits.
fn in_range(value: Decimal, limit: i64, scale: u32) -> bool {
    value > Decimal::ZERO && value < Decimal::from(limit) && value.normalize().scale() <= scale
}
