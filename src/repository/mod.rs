//! Persistence contracts consumed by the use cases.
//!
//! Lookups signal absence with `Ok(None)` or an empty list. `update` is a
//! compare-and-swap on the entity version: it fails with
//! [`AppError::Conflict`] when the stored record has moved on, and returns the
//! entity with its version advanced otherwise.

pub mod memory;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::account::{Account, AccountRole};
use crate::models::assignment::Assignment;
use crate::models::event::{DeliveryEvent, DeliveryEventType};
use crate::models::ids::{AccountId, AssignmentId, OrderId};
use crate::models::order::{Order, OrderStatus};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, AppError>;
    async fn find_by_shipper(&self, shipper_id: &AccountId) -> Result<Vec<Order>, AppError>;
    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, AppError>;
    async fn save(&self, order: Order) -> Result<Order, AppError>;
    async fn update(&self, order: Order) -> Result<Order, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn find_by_id(&self, id: &AssignmentId) -> Result<Option<Assignment>, AppError>;
    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Assignment>, AppError>;
    async fn find_by_courier(&self, courier_id: &AccountId) -> Result<Vec<Assignment>, AppError>;
    /// The order's assignment whose status is PENDING or ACCEPTED, if any.
    async fn find_active_by_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Assignment>, AppError>;
    async fn save(&self, assignment: Assignment) -> Result<Assignment, AppError>;
    /// Stores a new assignment unless its order already has an active one, in
    /// which case it fails with [`AppError::Conflict`]. The check and the
    /// insert happen as one step.
    async fn save_if_no_active(&self, assignment: Assignment) -> Result<Assignment, AppError>;
    async fn update(&self, assignment: Assignment) -> Result<Assignment, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
    async fn count_active(&self) -> Result<usize, AppError>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AppError>;
    async fn find_by_role(&self, role: AccountRole) -> Result<Vec<Account>, AppError>;
    async fn save(&self, account: Account) -> Result<Account, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}

/// Append-only: there is no update or delete.
#[async_trait]
pub trait DeliveryEventRepository: Send + Sync {
    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<DeliveryEvent>, AppError>;
    async fn find_by_type(
        &self,
        event_type: DeliveryEventType,
    ) -> Result<Vec<DeliveryEvent>, AppError>;
    async fn save(&self, event: DeliveryEvent) -> Result<DeliveryEvent, AppError>;
    /// Stores the event unless the order already has one of the same type, in
    /// which case it fails with [`AppError::Conflict`]. The check and the
    /// insert happen as one step.
    async fn save_first_of_type(&self, event: DeliveryEvent) -> Result<DeliveryEvent, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}
