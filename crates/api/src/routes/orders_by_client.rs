//! Read endpoints for the per-client confirmed order sums.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{ClientId, OrdersByClient};
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

/// GET /api/orders-by-client: all sums, largest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrdersByClient>>, ApiError> {
    Ok(Json(state.orders_by_client_service.list().await?))
}

/// GET /api/orders-by-client/:client_id: 404 until the client has a
/// confirmed order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(client_id): Path<String>,
) -> Result<Json<OrdersByClient>, ApiError> {
    let client_id: ClientId = parse_id(&client_id)?;
    Ok(Json(state.orders_by_client_service.get(client_id).await?))
}
