use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::models::event::{DeliveryEvent, DeliveryEventType};
use crate::models::ids::{AccountId, OrderId};
use crate::models::order::{NewOrder, Order, OrderStatus};
use crate::repository::{AssignmentRepository, OrderRepository};
use crate::usecases::{accepted_assignment_for, load_order, revert_assignment, EventRecorder};

pub struct PlaceOrder {
    orders: Arc<dyn OrderRepository>,
    recorder: EventRecorder,
}

impl PlaceOrder {
    pub fn new(orders: Arc<dyn OrderRepository>, recorder: EventRecorder) -> Self {
        Self { orders, recorder }
    }

    pub async fn execute(&self, new_order: NewOrder) -> Result<Order, AppError> {
        let order = self.orders.save(Order::place(new_order)).await?;

        self.recorder
            .record(
                DeliveryEvent::new(order.id().clone(), DeliveryEventType::OrderPlaced)
                    .with_payload(json!({
                        "shipper_id": order.shipper_id(),
                        "pickup_address": order.pickup_address(),
                        "dropoff_address": order.dropoff_address(),
                    })),
            )
            .await?;

        info!(order_id = %order.id(), shipper_id = %order.shipper_id(), "order placed");
        Ok(order)
    }
}

pub struct MarkReadyToShip {
    orders: Arc<dyn OrderRepository>,
    recorder: EventRecorder,
}

impl MarkReadyToShip {
    pub fn new(orders: Arc<dyn OrderRepository>, recorder: EventRecorder) -> Self {
        Self { orders, recorder }
    }

    pub async fn execute(&self, order_id: &OrderId) -> Result<Order, AppError> {
        let mut order = load_order(self.orders.as_ref(), order_id).await?;
        order.mark_ready_to_ship()?;
        let order = self.orders.update(order).await?;

        self.recorder
            .record(DeliveryEvent::new(
                order.id().clone(),
                DeliveryEventType::ReadyToShip,
            ))
            .await?;

        info!(order_id = %order.id(), "order ready to ship");
        Ok(order)
    }
}

/// Records that the courier holding the accepted assignment has collected
/// the parcel. The order stays ASSIGNED; only the event trail changes, and at
/// most one PICKED_UP event is kept per order.
pub struct ConfirmPickup {
    orders: Arc<dyn OrderRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    recorder: EventRecorder,
}

impl ConfirmPickup {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        recorder: EventRecorder,
    ) -> Self {
        Self {
            orders,
            assignments,
            recorder,
        }
    }

    pub async fn execute(
        &self,
        order_id: &OrderId,
        courier_id: &AccountId,
    ) -> Result<DeliveryEvent, AppError> {
        let order = load_order(self.orders.as_ref(), order_id).await?;
        if order.status() != OrderStatus::Assigned {
            return Err(AppError::InvalidState(format!(
                "order cannot be picked up; required status {}, current status {}",
                OrderStatus::Assigned,
                order.status()
            )));
        }

        let assignment =
            accepted_assignment_for(self.assignments.as_ref(), order_id, courier_id).await?;

        let event = self
            .recorder
            .record_first(
                DeliveryEvent::new(order_id.clone(), DeliveryEventType::PickedUp)
                    .with_courier(courier_id.clone())
                    .with_payload(json!({ "assignment_id": assignment.id() })),
            )
            .await?;

        info!(order_id = %order_id, courier_id = %courier_id, "order picked up");
        Ok(event)
    }
}

pub struct DeliverOrder {
    orders: Arc<dyn OrderRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    recorder: EventRecorder,
}

impl DeliverOrder {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        recorder: EventRecorder,
    ) -> Self {
        Self {
            orders,
            assignments,
            recorder,
        }
    }

    pub async fn execute(
        &self,
        order_id: &OrderId,
        courier_id: &AccountId,
    ) -> Result<Order, AppError> {
        let mut order = load_order(self.orders.as_ref(), order_id).await?;
        order.deliver()?;

        let snapshot =
            accepted_assignment_for(self.assignments.as_ref(), order_id, courier_id).await?;
        let mut assignment = snapshot.clone();
        assignment.complete()?;

        let completed = self.assignments.update(assignment).await?;
        let order = match self.orders.update(order).await {
            Ok(order) => order,
            Err(err) => {
                revert_assignment(self.assignments.as_ref(), completed, &snapshot).await;
                return Err(err);
            }
        };

        self.recorder
            .record(
                DeliveryEvent::new(order.id().clone(), DeliveryEventType::Delivered)
                    .with_courier(courier_id.clone())
                    .with_payload(json!({ "assignment_id": completed.id() })),
            )
            .await?;

        info!(order_id = %order.id(), courier_id = %courier_id, "order delivered");
        Ok(order)
    }
}

/// Cancels an order together with its active assignment, if it has one.
/// Cancelling an already-cancelled order returns it without writing.
pub struct CancelOrder {
    orders: Arc<dyn OrderRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    recorder: EventRecorder,
}

impl CancelOrder {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        recorder: EventRecorder,
    ) -> Self {
        Self {
            orders,
            assignments,
            recorder,
        }
    }

    pub async fn execute(
        &self,
        order_id: &OrderId,
        reason: Option<String>,
    ) -> Result<Order, AppError> {
        let mut order = load_order(self.orders.as_ref(), order_id).await?;
        let previous_status = order.status();
        order.cancel()?;
        if previous_status == OrderStatus::Cancelled {
            return Ok(order);
        }

        let active = self.assignments.find_active_by_order(order_id).await?;
        let cancelled_assignment = match &active {
            Some(snapshot) => {
                let mut assignment = snapshot.clone();
                assignment.cancel()?;
                Some(self.assignments.update(assignment).await?)
            }
            None => None,
        };

        let order = match self.orders.update(order).await {
            Ok(order) => order,
            Err(err) => {
                if let (Some(written), Some(snapshot)) = (cancelled_assignment, &active) {
                    revert_assignment(self.assignments.as_ref(), written, snapshot).await;
                }
                return Err(err);
            }
        };

        let mut event = DeliveryEvent::new(order.id().clone(), DeliveryEventType::Cancelled)
            .with_payload(json!({
                "previous_status": previous_status,
                "reason": reason,
            }));
        if let Some(assignment) = &cancelled_assignment {
            event = event.with_courier(assignment.courier_id().clone());
        }
        self.recorder.record(event).await?;

        info!(
            order_id = %order.id(),
            previous_status = %previous_status,
            "order cancelled"
        );
        Ok(order)
    }
}
