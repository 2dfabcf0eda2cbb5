//! Client CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Client, ClientId, NewClient, Order};
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

/// GET /api/clients: list clients by name.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(state.client_service.list().await?))
}

/// POST /api/clients: create a client.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewClient>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = state.client_service.create(req).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /api/clients/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    let id: ClientId = parse_id(&id)?;
    Ok(Json(state.client_service.get(id).await?))
}

/// PUT /api/clients/:id
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<NewClient>,
) -> Result<Json<Client>, ApiError> {
    let id: ClientId = parse_id(&id)?;
    Ok(Json(state.client_service.update(id, req).await?))
}

/// DELETE /api/clients/:id: refused while the client has orders.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ClientId = parse_id(&id)?;
    state.client_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/clients/:id/orders: the client's orders, most recent first.
#[tracing::instrument(skip(state))]
pub async fn orders<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let id: ClientId = parse_id(&id)?;
    Ok(Json(state.order_service.list_client_orders(id).await?))
}
