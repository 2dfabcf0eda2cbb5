//! Order lifecycle: commands, invariants and the service driving them.

mod commands;
mod service;

pub use commands::{CreateOrder, UpdateOrder};
pub use service::OrderService;

use common::OrderId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Invalid quantity.
    #[error(
        "Invalid quantity: {quantity} (must be greater than 0, below 10^12, with at most 3 decimal places)"
    )]
    InvalidQuantity { quantity: Decimal },

    /// Invalid price.
    #[error(
        "Invalid price: {price} (must be greater than 0, below 10^13, with at most 2 decimal places)"
    )]
    InvalidPrice { price: Decimal },

    /// The line amounts do not add up to a representable total.
    #[error("Order total is out of range")]
    AmountOutOfRange,

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Confirm was called on a confirmed order.
    #[error("Order {order_id} is already confirmed")]
    AlreadyConfirmed { order_id: OrderId },

    /// Confirmed orders cannot be edited.
    #[error("Order {order_id} is confirmed and cannot be edited")]
    ConfirmedImmutable { order_id: OrderId },
}
