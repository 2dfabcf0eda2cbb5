//! Client service.

use common::{Client, ClientId, NewClient};
use store::{Store, UnitOfWork};

use crate::error::{DomainError, required};

/// Service for managing clients.
#[derive(Clone)]
pub struct ClientService<S: Store> {
    store: S,
}

impl<S: Store> ClientService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, client: NewClient) -> Result<Client, DomainError> {
        let client = validate(client)?;
        let created = self.store.create_client(&client).await?;
        tracing::info!(client_id = %created.id, "client created");
        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ClientId) -> Result<Client, DomainError> {
        Ok(self.store.get_client(id).await?)
    }

    /// Lists clients ordered by name.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Client>, DomainError> {
        Ok(self.store.list_clients().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: ClientId, client: NewClient) -> Result<Client, DomainError> {
        let client = validate(client)?;
        Ok(self.store.update_client(id, &client).await?)
    }

    /// Deletes a client that no order references.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ClientId) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        tx.lock_client(id).await?;
        if tx.client_has_orders(id).await? {
            return Err(DomainError::Conflict(format!(
                "client {id} has associated orders"
            )));
        }
        tx.delete_client(id).await?;
        tx.commit().await?;

        tracing::info!(client_id = %id, "client deleted");
        Ok(())
    }
}

fn validate(client: NewClient) -> Result<NewClient, DomainError> {
    Ok(NewClient {
        name: required("name", &client.name)?,
        tax_id: client.tax_id.trim().to_string(),
    })
}
