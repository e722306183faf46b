//! Application operations. Each use case holds the repositories it needs and
//! runs one lifecycle step per `execute` call.

pub mod accounts;
pub mod assignments;
pub mod orders;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, warn};

use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::models::event::DeliveryEvent;
use crate::models::ids::{AccountId, AssignmentId, OrderId};
use crate::models::order::Order;
use crate::observability::metrics::Metrics;
use crate::repository::{AssignmentRepository, DeliveryEventRepository, OrderRepository};

pub use accounts::CreateAccount;
pub use assignments::{AcceptAssignment, OfferAssignment, RejectAssignment};
pub use orders::{CancelOrder, ConfirmPickup, DeliverOrder, MarkReadyToShip, PlaceOrder};

/// Appends delivery events and fans them out to live subscribers.
#[derive(Clone)]
pub struct EventRecorder {
    events: Arc<dyn DeliveryEventRepository>,
    events_tx: broadcast::Sender<DeliveryEvent>,
    metrics: Metrics,
}

impl EventRecorder {
    pub fn new(
        events: Arc<dyn DeliveryEventRepository>,
        events_tx: broadcast::Sender<DeliveryEvent>,
        metrics: Metrics,
    ) -> Self {
        Self {
            events,
            events_tx,
            metrics,
        }
    }

    pub async fn record(&self, event: DeliveryEvent) -> Result<DeliveryEvent, AppError> {
        let saved = self.events.save(event).await?;
        Ok(self.publish(saved))
    }

    /// Like [`record`](Self::record), but fails with a conflict if the order
    /// already has an event of this type.
    pub async fn record_first(&self, event: DeliveryEvent) -> Result<DeliveryEvent, AppError> {
        let saved = self.events.save_first_of_type(event).await?;
        Ok(self.publish(saved))
    }

    fn publish(&self, saved: DeliveryEvent) -> DeliveryEvent {
        self.metrics
            .delivery_events_total
            .with_label_values(&[saved.event_type().as_str()])
            .inc();
        // No subscribers is the normal case outside of live dashboards.
        let _ = self.events_tx.send(saved.clone());

        saved
    }
}

pub(crate) async fn load_order(
    orders: &dyn OrderRepository,
    id: &OrderId,
) -> Result<Order, AppError> {
    orders
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
}

pub(crate) async fn load_assignment(
    assignments: &dyn AssignmentRepository,
    id: &AssignmentId,
) -> Result<Assignment, AppError> {
    assignments
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("assignment {id} not found")))
}

/// The order's ACCEPTED assignment, checked to belong to `courier_id`.
pub(crate) async fn accepted_assignment_for(
    assignments: &dyn AssignmentRepository,
    order_id: &OrderId,
    courier_id: &AccountId,
) -> Result<Assignment, AppError> {
    let assignment = assignments
        .find_active_by_order(order_id)
        .await?
        .filter(|assignment| assignment.status() == AssignmentStatus::Accepted)
        .ok_or_else(|| {
            AppError::InvalidState(format!("order {order_id} has no accepted assignment"))
        })?;

    if assignment.courier_id() != courier_id {
        return Err(AppError::Conflict(format!(
            "courier {courier_id} does not hold the assignment for order {order_id}"
        )));
    }

    Ok(assignment)
}

/// Puts an assignment back to `snapshot`'s status after a later write in the
/// same use case failed. Failure here is logged; the caller still reports the
/// original error.
pub(crate) async fn revert_assignment(
    assignments: &dyn AssignmentRepository,
    mut written: Assignment,
    snapshot: &Assignment,
) {
    written.restore_from(snapshot);
    match assignments.update(written).await {
        Ok(restored) => warn!(
            assignment_id = %restored.id(),
            status = %restored.status(),
            "assignment write compensated"
        ),
        Err(err) => error!(
            assignment_id = %snapshot.id(),
            error = %err,
            "failed to compensate assignment write"
        ),
    }
}
