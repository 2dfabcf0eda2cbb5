//! Domain layer for the order management backend.
//!
//! This crate provides:
//! - the order lifecycle (create, update, confirm, delete) with its invariants
//! - maintenance of the per-client sum of confirmed order totals
//! - client and product services with referential-integrity guards

pub mod aggregate;
pub mod client;
pub mod error;
pub mod order;
pub mod product;

pub use aggregate::{OrdersByClientService, apply_delta};
pub use client::ClientService;
pub use common::{
    Client, ClientId, NewClient, NewOrderItem, NewProduct, Order, OrderId, OrderItem,
    OrderItemId, OrdersByClient, Product, ProductId,
};
pub use error::DomainError;
pub use order::{CreateOrder, OrderError, OrderService, UpdateOrder};
pub use product::ProductService;
