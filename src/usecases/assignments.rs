use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::models::assignment::Assignment;
use crate::models::event::{DeliveryEvent, DeliveryEventType};
use crate::models::ids::{AccountId, AssignmentId, OrderId};
use crate::models::order::not_assignable;
use crate::repository::{AssignmentRepository, OrderRepository};
use crate::usecases::{load_assignment, load_order, revert_assignment, EventRecorder};

/// Offers a READY_TO_SHIP order to a courier. Emits no delivery event; the
/// order only changes once the courier accepts.
pub struct OfferAssignment {
    orders: Arc<dyn OrderRepository>,
    assignments: Arc<dyn AssignmentRepository>,
}

impl OfferAssignment {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        assignments: Arc<dyn AssignmentRepository>,
    ) -> Self {
        Self {
            orders,
            assignments,
        }
    }

    pub async fn execute(
        &self,
        order_id: &OrderId,
        courier_id: &AccountId,
    ) -> Result<Assignment, AppError> {
        let order = load_order(self.orders.as_ref(), order_id).await?;
        if !order.can_be_assigned() {
            return Err(not_assignable());
        }

        if let Some(active) = self.assignments.find_active_by_order(order_id).await? {
            return Err(AppError::Conflict(format!(
                "order {order_id} already has an active assignment {}",
                active.id()
            )));
        }

        let assignment = self
            .assignments
            .save_if_no_active(Assignment::offer(order_id.clone(), courier_id.clone()))
            .await?;

        info!(
            assignment_id = %assignment.id(),
            order_id = %order_id,
            courier_id = %courier_id,
            "assignment offered"
        );
        Ok(assignment)
    }
}

/// Courier accepts an offer: the assignment becomes ACCEPTED and the order
/// ASSIGNED. Both transitions are checked before anything is written; if the
/// order write fails the assignment is put back to PENDING.
pub struct AcceptAssignment {
    orders: Arc<dyn OrderRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    recorder: EventRecorder,
}

impl AcceptAssignment {
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

    pub async fn execute(&self, assignment_id: &AssignmentId) -> Result<Assignment, AppError> {
        let snapshot = load_assignment(self.assignments.as_ref(), assignment_id).await?;
        let mut assignment = snapshot.clone();
        assignment.accept()?;

        let mut order = load_order(self.orders.as_ref(), assignment.order_id()).await?;
        order.assign()?;

        let accepted = self.assignments.update(assignment).await?;
        let order = match self.orders.update(order).await {
            Ok(order) => order,
            Err(err) => {
                revert_assignment(self.assignments.as_ref(), accepted, &snapshot).await;
                return Err(err);
            }
        };

        self.recorder
            .record(
                DeliveryEvent::new(order.id().clone(), DeliveryEventType::Assigned)
                    .with_courier(accepted.courier_id().clone())
                    .with_payload(json!({
                        "assignment_id": accepted.id(),
                        "courier_id": accepted.courier_id(),
                    })),
            )
            .await?;

        info!(
            assignment_id = %accepted.id(),
            order_id = %order.id(),
            courier_id = %accepted.courier_id(),
            "assignment accepted"
        );
        Ok(accepted)
    }
}

pub struct RejectAssignment {
    assignments: Arc<dyn AssignmentRepository>,
}

impl RejectAssignment {
    pub fn new(assignments: Arc<dyn AssignmentRepository>) -> Self {
        Self { assignments }
    }

    pub async fn execute(&self, assignment_id: &AssignmentId) -> Result<Assignment, AppError> {
        let mut assignment = load_assignment(self.assignments.as_ref(), assignment_id).await?;
        assignment.reject()?;
        let assignment = self.assignments.update(assignment).await?;

        info!(
            assignment_id = %assignment.id(),
            order_id = %assignment.order_id(),
            "assignment rejected"
        );
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::assignment::AssignmentStatus;
    use crate::models::order::OrderStatus;
    use crate::repository::DeliveryEventRepository;
    use crate::usecases::testing::{courier, FailingOrderUpdates, Fixture, YieldingAssignments};

    fn offer(fx: &Fixture) -> OfferAssignment {
        OfferAssignment::new(fx.orders.clone(), fx.assignments.clone())
    }

    fn accept(fx: &Fixture) -> AcceptAssignment {
        AcceptAssignment::new(fx.orders.clone(), fx.assignments.clone(), fx.recorder.clone())
    }

    #[tokio::test]
    async fn offer_on_placed_order_names_required_status() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::Placed).await;

        let err = offer(&fx).execute(order.id(), &courier("c1")).await.unwrap_err();

        assert_eq!(
            err,
            AppError::InvalidState("order cannot be assigned; required status READY_TO_SHIP".to_string())
        );
        assert_eq!(fx.assignments.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn offer_creates_pending_assignment_without_event() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::ReadyToShip).await;

        let assignment = offer(&fx).execute(order.id(), &courier("c1")).await.unwrap();

        assert_eq!(assignment.status(), AssignmentStatus::Pending);
        assert_eq!(assignment.order_id(), order.id());
        assert!(assignment.responded_at().is_none());
        assert_eq!(fx.events.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn second_offer_while_active_is_a_conflict() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::ReadyToShip).await;
        offer(&fx).execute(order.id(), &courier("c1")).await.unwrap();

        let err = offer(&fx).execute(order.id(), &courier("c2")).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(fx.assignments.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn offer_after_rejection_is_allowed() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::ReadyToShip).await;
        let first = offer(&fx).execute(order.id(), &courier("c1")).await.unwrap();
        RejectAssignment::new(fx.assignments.clone())
            .execute(first.id())
            .await
            .unwrap();

        let second = offer(&fx).execute(order.id(), &courier("c2")).await.unwrap();

        assert_eq!(second.courier_id(), &courier("c2"));
        assert_eq!(fx.assignments.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn accept_assigns_order_and_records_one_event() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::ReadyToShip).await;
        let offered = offer(&fx).execute(order.id(), &courier("c1")).await.unwrap();

        let accepted = accept(&fx).execute(offered.id()).await.unwrap();

        assert_eq!(accepted.status(), AssignmentStatus::Accepted);
        assert!(accepted.responded_at().is_some());
        let stored_order = fx.orders.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored_order.status(), OrderStatus::Assigned);

        let events = fx.events.find_by_type(DeliveryEventType::Assigned).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].order_id(), order.id());
        assert_eq!(events[0].courier_id(), Some(&courier("c1")));
        let payload = events[0].payload().unwrap();
        assert_eq!(payload["assignment_id"], offered.id().as_str());
        assert_eq!(payload["courier_id"], "c1");
    }

    #[tokio::test]
    async fn accept_twice_fails_without_writes() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::ReadyToShip).await;
        let offered = offer(&fx).execute(order.id(), &courier("c1")).await.unwrap();
        accept(&fx).execute(offered.id()).await.unwrap();

        let err = accept(&fx).execute(offered.id()).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        let stored = fx.assignments.find_by_id(offered.id()).await.unwrap().unwrap();
        assert_eq!(stored.version(), 1);
        let stored_order = fx.orders.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored_order.version(), 1);
        assert_eq!(fx.events.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn accept_when_order_not_assignable_writes_nothing() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::ReadyToShip).await;
        let offered = offer(&fx).execute(order.id(), &courier("c1")).await.unwrap();
        let mut cancelled = fx.orders.find_by_id(order.id()).await.unwrap().unwrap();
        cancelled.cancel().unwrap();
        fx.orders.update(cancelled).await.unwrap();

        let err = accept(&fx).execute(offered.id()).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        let stored = fx.assignments.find_by_id(offered.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), AssignmentStatus::Pending);
        assert_eq!(stored.version(), 0);
    }

    #[tokio::test]
    async fn accept_unknown_assignment_is_not_found() {
        let fx = Fixture::new();
        let err = accept(&fx)
            .execute(&AssignmentId::new("missing").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_order_write_puts_assignment_back_to_pending() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::ReadyToShip).await;
        let offered = offer(&fx).execute(order.id(), &courier("c1")).await.unwrap();
        let accept = AcceptAssignment::new(
            Arc::new(FailingOrderUpdates(fx.orders.clone())),
            fx.assignments.clone(),
            fx.recorder.clone(),
        );

        let err = accept.execute(offered.id()).await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        let stored = fx.assignments.find_by_id(offered.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), AssignmentStatus::Pending);
        assert!(stored.responded_at().is_none());
        let stored_order = fx.orders.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored_order.status(), OrderStatus::ReadyToShip);
        assert_eq!(fx.events.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_offers_leave_one_active_assignment() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::ReadyToShip).await;
        let offer = OfferAssignment::new(
            fx.orders.clone(),
            Arc::new(YieldingAssignments(fx.assignments.clone())),
        );

        let (c1, c2) = (courier("c1"), courier("c2"));
        let (a, b) = tokio::join!(
            offer.execute(order.id(), &c1),
            offer.execute(order.id(), &c2)
        );

        assert!(a.is_ok());
        assert!(matches!(b, Err(AppError::Conflict(_))));
        let for_order = fx.assignments.find_by_order(order.id()).await.unwrap();
        assert_eq!(for_order.len(), 1);
        assert_eq!(fx.assignments.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_accepts_lose_on_stale_version() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::ReadyToShip).await;
        let offered = offer(&fx).execute(order.id(), &courier("c1")).await.unwrap();
        let accept = AcceptAssignment::new(
            fx.orders.clone(),
            Arc::new(YieldingAssignments(fx.assignments.clone())),
            fx.recorder.clone(),
        );

        let (a, b) = tokio::join!(accept.execute(offered.id()), accept.execute(offered.id()));

        assert!(a.is_ok());
        assert!(
            matches!(b, Err(AppError::Conflict(ref msg)) if msg.contains("modified concurrently"))
        );
        let stored = fx.assignments.find_by_id(offered.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), AssignmentStatus::Accepted);
        assert_eq!(stored.version(), 1);
        let stored_order = fx.orders.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored_order.version(), 1);
        assert_eq!(fx.events.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reject_only_from_pending() {
        let fx = Fixture::new();
        let order = fx.order_in(OrderStatus::ReadyToShip).await;
        let offered = offer(&fx).execute(order.id(), &courier("c1")).await.unwrap();
        let reject = RejectAssignment::new(fx.assignments.clone());

        let rejected = reject.execute(offered.id()).await.unwrap();
        assert_eq!(rejected.status(), AssignmentStatus::Rejected);
        assert!(rejected.responded_at().is_some());

        let err = reject.execute(offered.id()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }
}
