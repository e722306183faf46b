use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::ids::{AccountId, EventId, OrderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryEventType {
    OrderPlaced,
    ReadyToShip,
    Assigned,
    PickedUp,
    Delivered,
    Cancelled,
}

impl DeliveryEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryEventType::OrderPlaced => "ORDER_PLACED",
            DeliveryEventType::ReadyToShip => "READY_TO_SHIP",
            DeliveryEventType::Assigned => "ASSIGNED",
            DeliveryEventType::PickedUp => "PICKED_UP",
            DeliveryEventType::Delivered => "DELIVERED",
            DeliveryEventType::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for DeliveryEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryEventType {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "ORDER_PLACED" => Ok(DeliveryEventType::OrderPlaced),
            "READY_TO_SHIP" => Ok(DeliveryEventType::ReadyToShip),
            "ASSIGNED" => Ok(DeliveryEventType::Assigned),
            "PICKED_UP" => Ok(DeliveryEventType::PickedUp),
            "DELIVERED" => Ok(DeliveryEventType::Delivered),
            "CANCELLED" => Ok(DeliveryEventType::Cancelled),
            other => Err(AppError::Validation(format!("unknown event type: {other}"))),
        }
    }
}

/// Append-only audit record of a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryEvent {
    id: EventId,
    order_id: OrderId,
    courier_id: Option<AccountId>,
    #[serde(rename = "type")]
    event_type: DeliveryEventType,
    payload: Option<Value>,
    occurred_at: DateTime<Utc>,
}

impl DeliveryEvent {
    pub fn new(order_id: OrderId, event_type: DeliveryEventType) -> Self {
        Self {
            id: EventId::generate(),
            order_id,
            courier_id: None,
            event_type,
            payload: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_courier(mut self, courier_id: AccountId) -> Self {
        self.courier_id = Some(courier_id);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Rebuilds an event from its stored columns. A payload that is not
    /// valid JSON is dropped rather than failing the read.
    pub fn from_stored(
        id: EventId,
        order_id: OrderId,
        courier_id: Option<AccountId>,
        event_type: DeliveryEventType,
        encoded_payload: Option<&str>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            courier_id,
            event_type,
            payload: encoded_payload.and_then(|raw| serde_json::from_str(raw).ok()),
            occurred_at,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn courier_id(&self) -> Option<&AccountId> {
        self.courier_id.as_ref()
    }

    pub fn event_type(&self) -> DeliveryEventType {
        self.event_type
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn encoded_payload(&self) -> Option<String> {
        self.payload.as_ref().map(Value::to_string)
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
