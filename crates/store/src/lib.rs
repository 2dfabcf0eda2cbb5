pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{
    Client, ClientId, NewClient, NewOrderItem, NewProduct, Order, OrderHeader, OrderId, OrderItem,
    OrderItemId, OrdersByClient, Product, ProductId,
};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{NewOrder, Store, UnitOfWork};
