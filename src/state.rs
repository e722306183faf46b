use std::sync::Arc;

use tokio::sync::broadcast;

use crate::models::event::DeliveryEvent;
use crate::observability::metrics::Metrics;
use crate::repository::memory::{
    InMemoryAccountRepository, InMemoryAssignmentRepository, InMemoryDeliveryEventRepository,
    InMemoryOrderRepository,
};
use crate::repository::{
    AccountRepository, AssignmentRepository, DeliveryEventRepository, OrderRepository,
};
use crate::usecases::{
    AcceptAssignment, CancelOrder, ConfirmPickup, CreateAccount, DeliverOrder, EventRecorder,
    MarkReadyToShip, OfferAssignment, PlaceOrder, RejectAssignment,
};

pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub events: Arc<dyn DeliveryEventRepository>,
    pub events_tx: broadcast::Sender<DeliveryEvent>,
    pub metrics: Metrics,
}

impl AppState {
    /// State backed by the in-memory repositories.
    pub fn new(event_buffer_size: usize) -> Self {
        Self::with_repositories(
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(InMemoryAssignmentRepository::new()),
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(InMemoryDeliveryEventRepository::new()),
            event_buffer_size,
        )
    }

    pub fn with_repositories(
        orders: Arc<dyn OrderRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        accounts: Arc<dyn AccountRepository>,
        events: Arc<dyn DeliveryEventRepository>,
        event_buffer_size: usize,
    ) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            orders,
            assignments,
            accounts,
            events,
            events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn recorder(&self) -> EventRecorder {
        EventRecorder::new(
            self.events.clone(),
            self.events_tx.clone(),
            self.metrics.clone(),
        )
    }

    pub fn create_account(&self) -> CreateAccount {
        CreateAccount::new(self.accounts.clone())
    }

    pub fn place_order(&self) -> PlaceOrder {
        PlaceOrder::new(self.orders.clone(), self.recorder())
    }

    pub fn mark_ready_to_ship(&self) -> MarkReadyToShip {
        MarkReadyToShip::new(self.orders.clone(), self.recorder())
    }

    pub fn confirm_pickup(&self) -> ConfirmPickup {
        ConfirmPickup::new(self.orders.clone(), self.assignments.clone(), self.recorder())
    }

    pub fn deliver_order(&self) -> DeliverOrder {
        DeliverOrder::new(self.orders.clone(), self.assignments.clone(), self.recorder())
    }

    pub fn cancel_order(&self) -> CancelOrder {
        CancelOrder::new(self.orders.clone(), self.assignments.clone(), self.recorder())
    }

    pub fn offer_assignment(&self) -> OfferAssignment {
        OfferAssignment::new(self.orders.clone(), self.assignments.clone())
    }

    pub fn accept_assignment(&self) -> AcceptAssignment {
        AcceptAssignment::new(self.orders.clone(), self.assignments.clone(), self.recorder())
    }

    pub fn reject_assignment(&self) -> RejectAssignment {
        RejectAssignment::new(self.assignments.clone())
    }
}
