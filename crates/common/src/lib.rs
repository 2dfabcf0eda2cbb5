//! Shared identifiers and entity records.

pub mod model;
pub mod types;

pub use model::{
    Client, NewClient, NewOrderItem, NewProduct, Order, OrderHeader, OrderItem, OrdersByClient,
    Product,
};
pub use types::{ClientId, OrderId, OrderItemId, ProductId};
