//! Order placement, decision and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use catalog::{CatalogStore, LineRequest};
use common::{AggregateId, CustomerId};
use domain::{Aggregate, Order, OrderStatus};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: String,
    pub lines: Vec<LineRequest>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
    /// Who is making the decision, recorded on the order.
    pub actor: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub lines: Vec<OrderLineResponse>,
    pub total_cents: i64,
    pub created_at: Option<String>,
    pub decided_at: Option<String>,
    pub decided_by: Option<String>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().map(|id| id.to_string()).unwrap_or_default(),
            customer_id: order
                .customer_id()
                .map(|c| c.to_string())
                .unwrap_or_default(),
            status: order.status().to_string(),
            lines: order
                .lines()
                .iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    subtotal_cents: line.subtotal().cents(),
                })
                .collect(),
            total_cents: order.total().cents(),
            created_at: order.created_at().map(|t| t.to_rfc3339()),
            decided_at: order.decided_at().map(|t| t.to_rfc3339()),
            decided_by: order.decided_by().map(String::from),
        }
    }
}

/// Response type for event envelope data.
#[derive(Serialize)]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub version: i64,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

// -- Handlers --

/// POST /orders: reserve stock and record a Pending order.
#[tracing::instrument(skip(state, body))]
pub async fn place<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    body: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    let Json(req) = body?;
    let customer_id = parse_customer_id(&req.customer_id)?;

    let order = state.controller.place_order(customer_id, req.lines).await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// PUT /orders/{id}/status: approve or decline a Pending order.
#[tracing::instrument(skip(state, body))]
pub async fn set_status<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
    body: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    let order_id = parse_aggregate_id(&id)?;
    let Json(req) = body?;
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: domain::OrderError| ApiError::BadRequest(e.to_string()))?;

    let order = state
        .controller
        .set_status(order_id, status, req.actor)
        .await?;

    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    let order_id = parse_aggregate_id(&id)?;
    let order = state
        .controller
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders: every order, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_all<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    let orders = state.controller.list_all_orders().await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /customers/{customer_id}/orders: one customer's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_customer<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    let customer_id = parse_customer_id(&customer_id)?;
    let orders = state.controller.list_orders(customer_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}/events: the order's recorded events.
#[tracing::instrument(skip(state))]
pub async fn events<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    let order_id = parse_aggregate_id(&id)?;
    let envelopes = state.controller.order_history(order_id).await?;

    if envelopes.is_empty() {
        return Err(ApiError::NotFound(format!("Order {id} not found")));
    }

    let responses = envelopes
        .into_iter()
        .map(|e| EventEnvelopeResponse {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            version: e.version.as_i64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
        })
        .collect();

    Ok(Json(responses))
}

fn parse_aggregate_id(id: &str) -> Result<AggregateId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(AggregateId::from(uuid))
}

fn parse_customer_id(id: &str) -> Result<CustomerId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
    Ok(CustomerId::from(uuid))
}
