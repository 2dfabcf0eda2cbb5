//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{ClientId, CreateOrder, NewOrderItem, Order, OrderId, UpdateOrder};
use serde::Deserialize;
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub client_id: ClientId,
    pub number: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
}

/// Omitted fields keep their stored values; omitted or empty `items` leave
/// the item set as it is.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub client_id: Option<ClientId>,
    pub number: Option<String>,
    pub items: Option<Vec<NewOrderItem>>,
}

impl From<CreateOrderRequest> for CreateOrder {
    fn from(req: CreateOrderRequest) -> Self {
        let cmd = CreateOrder::new(req.client_id, req.number, req.items);
        match req.date {
            Some(date) => cmd.dated(date),
            None => cmd,
        }
    }
}

impl From<UpdateOrderRequest> for UpdateOrder {
    fn from(req: UpdateOrderRequest) -> Self {
        UpdateOrder {
            client_id: req.client_id,
            number: req.number,
            items: req.items,
        }
    }
}

// -- Handlers --

/// GET /api/orders: all orders, most recent first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.order_service.list_orders().await?))
}

/// POST /api/orders: create an order together with its items.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.order_service.create_order(req.into()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/:id: load a hydrated order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    Ok(Json(state.order_service.get_order(order_id).await?))
}

/// PUT /api/orders/:id: edit an unconfirmed order.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let order = state
        .order_service
        .update_order(order_id, req.into())
        .await?;
    Ok(Json(order))
}

/// DELETE /api/orders/:id
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    state.order_service.delete_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/orders/:id/confirm: confirm and fold the total into the
/// client's sum.
#[tracing::instrument(skip(state))]
pub async fn confirm<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    Ok(Json(state.order_service.confirm_order(order_id).await?))
}
