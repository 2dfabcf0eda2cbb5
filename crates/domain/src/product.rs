//! Product service.

use common::{NewProduct, OrderItem, Product, ProductId};
use store::{Store, UnitOfWork};

use crate::error::{DomainError, required};

/// Service for managing products.
#[derive(Clone)]
pub struct ProductService<S: Store> {
    store: S,
}

impl<S: Store> ProductService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let product = validate(product)?;
        let created = self.store.create_product(&product).await?;
        tracing::info!(product_id = %created.id, "product created");
        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Product, DomainError> {
        Ok(self.store.get_product(id).await?)
    }

    /// Lists products ordered by name.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self.store.list_products().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: ProductId, product: NewProduct) -> Result<Product, DomainError> {
        let product = validate(product)?;
        Ok(self.store.update_product(id, &product).await?)
    }

    /// Deletes a product that no order item references.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        tx.lock_product(id).await?;
        if tx.product_has_order_items(id).await? {
            return Err(DomainError::Conflict(format!(
                "product {id} has associated orders"
            )));
        }
        tx.delete_product(id).await?;
        tx.commit().await?;

        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Lists every order item that references the product.
    #[tracing::instrument(skip(self))]
    pub async fn list_order_items(&self, id: ProductId) -> Result<Vec<OrderItem>, DomainError> {
        Ok(self.store.list_product_order_items(id).await?)
    }
}

fn validate(product: NewProduct) -> Result<NewProduct, DomainError> {
    Ok(NewProduct {
        name: required("name", &product.name)?,
        unit: required("unit", &product.unit)?,
    })
}
