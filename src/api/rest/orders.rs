use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::rest::observed;
use crate::error::AppError;
use crate::models::event::DeliveryEvent;
use crate::models::ids::{AccountId, OrderId};
use crate::models::order::{NewOrder, Order, OrderStatus};
use crate::models::value::{normalize_optional_text, Address, TimeWindow, Weight};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/events", get(list_order_events))
        .route("/orders/:id/ready-to-ship", put(mark_ready_to_ship))
        .route("/orders/:id/pickup", put(confirm_pickup))
        .route("/orders/:id/deliver", put(deliver_order))
        .route("/orders/:id/cancel", put(cancel_order))
}

#[derive(Deserialize)]
pub struct TimeWindowRequest {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub shipper_id: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup_time_window: Option<TimeWindowRequest>,
    pub dropoff_time_window: Option<TimeWindowRequest>,
    pub total_weight: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct CourierRequest {
    pub courier_id: String,
}

#[derive(Deserialize, Default)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub shipper_id: Option<String>,
    pub status: Option<String>,
}

impl CreateOrderRequest {
    fn into_new_order(self) -> Result<NewOrder, AppError> {
        Ok(NewOrder {
            shipper_id: AccountId::new(&self.shipper_id)?,
            pickup_address: Address::new(&self.pickup_address)?,
            dropoff_address: Address::new(&self.dropoff_address)?,
            pickup_time_window: time_window(self.pickup_time_window)?,
            dropoff_time_window: time_window(self.dropoff_time_window)?,
            total_weight: match self.total_weight {
                Some(weight) => Weight::new(weight)?,
                None => Weight::zero(),
            },
            notes: normalize_optional_text(self.notes),
        })
    }
}

fn time_window(raw: Option<TimeWindowRequest>) -> Result<TimeWindow, AppError> {
    match raw {
        Some(window) => TimeWindow::new(window.start, window.end),
        None => Ok(TimeWindow::unbounded()),
    }
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let new_order = payload.into_new_order()?;
    let order = observed(&state, "place_order", state.place_order().execute(new_order)).await?;
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let id = OrderId::new(id)?;
    let order = state
        .orders
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let orders = match (query.shipper_id, status) {
        (Some(shipper_id), status) => state
            .orders
            .find_by_shipper(&AccountId::new(shipper_id)?)
            .await?
            .into_iter()
            .filter(|order| status.is_none_or(|status| order.status() == status))
            .collect(),
        (None, Some(status)) => state.orders.find_by_status(status).await?,
        (None, None) => {
            return Err(AppError::Validation(
                "either shipper_id or status must be given".to_string(),
            ));
        }
    };

    Ok(Json(orders))
}

async fn list_order_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DeliveryEvent>>, AppError> {
    let id = OrderId::new(id)?;
    if state.orders.find_by_id(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("order {id} not found")));
    }

    Ok(Json(state.events.find_by_order(&id).await?))
}

async fn mark_ready_to_ship(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let id = OrderId::new(id)?;
    let order = observed(&state, "mark_ready_to_ship", state.mark_ready_to_ship().execute(&id))
        .await?;
    Ok(Json(order))
}

async fn confirm_pickup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CourierRequest>,
) -> Result<Json<DeliveryEvent>, AppError> {
    let id = OrderId::new(id)?;
    let courier_id = AccountId::new(&payload.courier_id)?;
    let event = observed(
        &state,
        "confirm_pickup",
        state.confirm_pickup().execute(&id, &courier_id),
    )
    .await?;
    Ok(Json(event))
}

async fn deliver_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CourierRequest>,
) -> Result<Json<Order>, AppError> {
    let id = OrderId::new(id)?;
    let courier_id = AccountId::new(&payload.courier_id)?;
    let order = observed(
        &state,
        "deliver_order",
        state.deliver_order().execute(&id, &courier_id),
    )
    .await?;
    Ok(Json(order))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Option<Json<CancelOrderRequest>>,
) -> Result<Json<Order>, AppError> {
    let id = OrderId::new(id)?;
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let reason = normalize_optional_text(request.reason);
    let order = observed(&state, "cancel_order", state.cancel_order().execute(&id, reason)).await?;
    Ok(Json(order))
}
