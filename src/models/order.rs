use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::ids::{AccountId, OrderId};
use crate::models::value::{Address, TimeWindow, Weight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    ReadyToShip,
    Assigned,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::ReadyToShip => "READY_TO_SHIP",
            OrderStatus::Assigned => "ASSIGNED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn can_be_assigned(&self) -> bool {
        matches!(self, OrderStatus::ReadyToShip)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "PLACED" => Ok(OrderStatus::Placed),
            "READY_TO_SHIP" => Ok(OrderStatus::ReadyToShip),
            "ASSIGNED" => Ok(OrderStatus::Assigned),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::Validation(format!("unknown order status: {other}"))),
        }
    }
}

/// Everything a shipper supplies when placing an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub shipper_id: AccountId,
    pub pickup_address: Address,
    pub dropoff_address: Address,
    pub pickup_time_window: TimeWindow,
    pub dropoff_time_window: TimeWindow,
    pub total_weight: Weight,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    id: OrderId,
    shipper_id: AccountId,
    status: OrderStatus,
    pickup_address: Address,
    dropoff_address: Address,
    pickup_time_window: TimeWindow,
    dropoff_time_window: TimeWindow,
    total_weight: Weight,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Order {
    pub fn place(new: NewOrder) -> Self {
        Self {
            id: OrderId::generate(),
            shipper_id: new.shipper_id,
            status: OrderStatus::Placed,
            pickup_address: new.pickup_address,
            dropoff_address: new.dropoff_address,
            pickup_time_window: new.pickup_time_window,
            dropoff_time_window: new.dropoff_time_window,
            total_weight: new.total_weight,
            notes: new.notes,
            created_at: Utc::now(),
            version: 0,
        }
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn shipper_id(&self) -> &AccountId {
        &self.shipper_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn pickup_address(&self) -> &Address {
        &self.pickup_address
    }

    pub fn dropoff_address(&self) -> &Address {
        &self.dropoff_address
    }

    pub fn pickup_time_window(&self) -> &TimeWindow {
        &self.pickup_time_window
    }

    pub fn dropoff_time_window(&self) -> &TimeWindow {
        &self.dropoff_time_window
    }

    pub fn total_weight(&self) -> Weight {
        self.total_weight
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn can_be_assigned(&self) -> bool {
        self.status.can_be_assigned()
    }

    pub fn mark_ready_to_ship(&mut self) -> Result<(), AppError> {
        self.require(OrderStatus::Placed, "marked ready to ship")?;
        self.status = OrderStatus::ReadyToShip;
        Ok(())
    }

    pub fn assign(&mut self) -> Result<(), AppError> {
        if !self.can_be_assigned() {
            return Err(not_assignable());
        }
        self.status = OrderStatus::Assigned;
        Ok(())
    }

    pub fn deliver(&mut self) -> Result<(), AppError> {
        self.require(OrderStatus::Assigned, "delivered")?;
        self.status = OrderStatus::Delivered;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), AppError> {
        if self.status == OrderStatus::Delivered {
            return Err(AppError::InvalidState(
                "order cannot be cancelled; it has already been delivered".to_string(),
            ));
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    fn require(&self, required: OrderStatus, action: &str) -> Result<(), AppError> {
        if self.status != required {
            return Err(AppError::InvalidState(format!(
                "order cannot be {action}; required status {required}, current status {}",
                self.status
            )));
        }
        Ok(())
    }
}

pub(crate) fn not_assignable() -> AppError {
    AppError::InvalidState(format!(
        "order cannot be assigned; required status {}",
        OrderStatus::ReadyToShip
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_order() -> Order {
        Order::place(NewOrder {
            shipper_id: AccountId::new("s1").unwrap(),
            pickup_address: Address::new("A").unwrap(),
            dropoff_address: Address::new("B").unwrap(),
            pickup_time_window: TimeWindow::unbounded(),
            dropoff_time_window: TimeWindow::unbounded(),
            total_weight: Weight::new(5.0).unwrap(),
            notes: None,
        })
    }

    pub(crate) fn order_in(status: OrderStatus) -> Order {
        let mut order = sample_order();
        order.status = status;
        order
    }

    const ALL: [OrderStatus; 5] = [
        OrderStatus::Placed,
        OrderStatus::ReadyToShip,
        OrderStatus::Assigned,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    #[test]
    fn new_order_starts_placed() {
        let order = sample_order();
        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.version(), 0);
        assert!(!order.can_be_assigned());
    }

    #[test]
    fn mark_ready_to_ship_only_from_placed() {
        for status in ALL {
            let mut order = order_in(status);
            let result = order.mark_ready_to_ship();
            assert_eq!(result.is_ok(), status == OrderStatus::Placed, "{status}");
            if result.is_ok() {
                assert_eq!(order.status(), OrderStatus::ReadyToShip);
            } else {
                assert_eq!(order.status(), status);
            }
        }
    }

    #[test]
    fn assign_only_from_ready_to_ship() {
        for status in ALL {
            let mut order = order_in(status);
            assert_eq!(order.assign().is_ok(), status == OrderStatus::ReadyToShip, "{status}");
        }
    }

    #[test]
    fn deliver_only_from_assigned() {
        for status in ALL {
            let mut order = order_in(status);
            assert_eq!(order.deliver().is_ok(), status == OrderStatus::Assigned, "{status}");
        }
    }

    #[test]
    fn cancel_fails_only_when_delivered() {
        for status in ALL {
            let mut order = order_in(status);
            let result = order.cancel();
            assert_eq!(result.is_err(), status == OrderStatus::Delivered, "{status}");
        }
    }

    #[test]
    fn assign_error_names_required_status() {
        let mut order = sample_order();
        let err = order.assign().unwrap_err();
        assert!(matches!(&err, AppError::InvalidState(msg) if msg.contains("READY_TO_SHIP")));
    }

    #[test]
    fn status_codes_parse_and_reject_unknown() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
        assert!("placed".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn status_serializes_as_code() {
        let json = serde_json::to_string(&OrderStatus::ReadyToShip).unwrap();
        assert_eq!(json, "\"READY_TO_SHIP\"");
    }
}
