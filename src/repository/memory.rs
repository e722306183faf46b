use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::AppError;
use crate::models::account::{Account, AccountRole};
use crate::models::assignment::Assignment;
use crate::models::event::{DeliveryEvent, DeliveryEventType};
use crate::models::ids::{AccountId, AssignmentId, EventId, OrderId};
use crate::models::order::{Order, OrderStatus};
use crate::repository::{
    AccountRepository, AssignmentRepository, DeliveryEventRepository, OrderRepository,
};

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: DashMap<OrderId, Order>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted(&self, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|order| order.created_at());
        orders
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, AppError> {
        Ok(self.orders.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_shipper(&self, shipper_id: &AccountId) -> Result<Vec<Order>, AppError> {
        Ok(self.collect_sorted(|order| order.shipper_id() == shipper_id))
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, AppError> {
        Ok(self.collect_sorted(|order| order.status() == status))
    }

    async fn save(&self, order: Order) -> Result<Order, AppError> {
        match self.orders.entry(order.id().clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "order {} already exists",
                order.id()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                Ok(order)
            }
        }
    }

    async fn update(&self, mut order: Order) -> Result<Order, AppError> {
        let mut stored = self
            .orders
            .get_mut(order.id())
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order.id())))?;

        if stored.version() != order.version() {
            return Err(stale("order", order.id().as_str(), order.version(), stored.version()));
        }

        order.bump_version();
        *stored = order.clone();
        Ok(order)
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.orders.len())
    }
}

#[derive(Default)]
pub struct InMemoryAssignmentRepository {
    assignments: DashMap<AssignmentId, Assignment>,
    // Held while an offer checks for an active assignment and inserts.
    order_locks: DashMap<OrderId, ()>,
}

impl InMemoryAssignmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted(&self, keep: impl Fn(&Assignment) -> bool) -> Vec<Assignment> {
        let mut assignments: Vec<Assignment> = self
            .assignments
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        assignments.sort_by_key(|assignment| assignment.offered_at());
        assignments
    }

    fn insert_new(&self, assignment: Assignment) -> Result<Assignment, AppError> {
        match self.assignments.entry(assignment.id().clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "assignment {} already exists",
                assignment.id()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(assignment.clone());
                Ok(assignment)
            }
        }
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn find_by_id(&self, id: &AssignmentId) -> Result<Option<Assignment>, AppError> {
        Ok(self.assignments.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Assignment>, AppError> {
        Ok(self.collect_sorted(|assignment| assignment.order_id() == order_id))
    }

    async fn find_by_courier(&self, courier_id: &AccountId) -> Result<Vec<Assignment>, AppError> {
        Ok(self.collect_sorted(|assignment| assignment.courier_id() == courier_id))
    }

    async fn find_active_by_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Assignment>, AppError> {
        Ok(self
            .collect_sorted(|assignment| {
                assignment.order_id() == order_id && assignment.is_active()
            })
            .pop())
    }

    async fn save(&self, assignment: Assignment) -> Result<Assignment, AppError> {
        self.insert_new(assignment)
    }

    async fn save_if_no_active(&self, assignment: Assignment) -> Result<Assignment, AppError> {
        let _guard = self
            .order_locks
            .entry(assignment.order_id().clone())
            .or_default();

        let active = self
            .assignments
            .iter()
            .find(|entry| {
                entry.value().order_id() == assignment.order_id() && entry.value().is_active()
            })
            .map(|entry| entry.key().clone());
        if let Some(active) = active {
            return Err(AppError::Conflict(format!(
                "order {} already has an active assignment {active}",
                assignment.order_id()
            )));
        }

        self.insert_new(assignment)
    }

    async fn update(&self, mut assignment: Assignment) -> Result<Assignment, AppError> {
        let mut stored = self.assignments.get_mut(assignment.id()).ok_or_else(|| {
            AppError::NotFound(format!("assignment {} not found", assignment.id()))
        })?;

        if stored.version() != assignment.version() {
            return Err(stale(
                "assignment",
                assignment.id().as_str(),
                assignment.version(),
                stored.version(),
            ));
        }

        assignment.bump_version();
        *stored = assignment.clone();
        Ok(assignment)
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.assignments.len())
    }

    async fn count_active(&self) -> Result<usize, AppError> {
        Ok(self
            .assignments
            .iter()
            .filter(|entry| entry.value().is_active())
            .count())
    }
}

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: DashMap<AccountId, Account>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_role(&self, role: AccountRole) -> Result<Vec<Account>, AppError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|entry| entry.value().role() == role)
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.created_at());
        Ok(accounts)
    }

    async fn save(&self, account: Account) -> Result<Account, AppError> {
        match self.accounts.entry(account.id().clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "account {} already exists",
                account.id()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(account.clone());
                Ok(account)
            }
        }
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.accounts.len())
    }
}

/// Events are kept the way a table row would hold them, with the payload
/// JSON-encoded, and decoded again on every read.
#[derive(Debug, Clone)]
struct EventRecord {
    sequence: u64,
    id: EventId,
    order_id: OrderId,
    courier_id: Option<AccountId>,
    event_type: DeliveryEventType,
    payload: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl EventRecord {
    fn from_event(sequence: u64, event: &DeliveryEvent) -> Self {
        Self {
            sequence,
            id: event.id().clone(),
            order_id: event.order_id().clone(),
            courier_id: event.courier_id().cloned(),
            event_type: event.event_type(),
            payload: event.encoded_payload(),
            occurred_at: event.occurred_at(),
        }
    }

    fn to_event(&self) -> DeliveryEvent {
        DeliveryEvent::from_stored(
            self.id.clone(),
            self.order_id.clone(),
            self.courier_id.clone(),
            self.event_type,
            self.payload.as_deref(),
            self.occurred_at,
        )
    }
}

#[derive(Default)]
pub struct InMemoryDeliveryEventRepository {
    events: DashMap<EventId, EventRecord>,
    next_sequence: AtomicU64,
    order_locks: DashMap<OrderId, ()>,
}

impl InMemoryDeliveryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted(&self, keep: impl Fn(&EventRecord) -> bool) -> Vec<DeliveryEvent> {
        let mut records: Vec<EventRecord> = self
            .events
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.sequence);
        records.iter().map(EventRecord::to_event).collect()
    }

    fn insert_new(&self, event: DeliveryEvent) -> Result<DeliveryEvent, AppError> {
        match self.events.entry(event.id().clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "event {} already recorded",
                event.id()
            ))),
            Entry::Vacant(slot) => {
                let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert(EventRecord::from_event(sequence, &event));
                Ok(event)
            }
        }
    }

    #[cfg(test)]
    fn insert_raw(&self, record: EventRecord) {
        self.events.insert(record.id.clone(), record);
    }
}

#[async_trait]
impl DeliveryEventRepository for InMemoryDeliveryEventRepository {
    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<DeliveryEvent>, AppError> {
        Ok(self.collect_sorted(|record| &record.order_id == order_id))
    }

    async fn find_by_type(
        &self,
        event_type: DeliveryEventType,
    ) -> Result<Vec<DeliveryEvent>, AppError> {
        Ok(self.collect_sorted(|record| record.event_type == event_type))
    }

    async fn save(&self, event: DeliveryEvent) -> Result<DeliveryEvent, AppError> {
        self.insert_new(event)
    }

    async fn save_first_of_type(&self, event: DeliveryEvent) -> Result<DeliveryEvent, AppError> {
        let _guard = self.order_locks.entry(event.order_id().clone()).or_default();

        let recorded = self.events.iter().any(|entry| {
            &entry.value().order_id == event.order_id()
                && entry.value().event_type == event.event_type()
        });
        if recorded {
            return Err(AppError::Conflict(format!(
                "order {} already has a {} event",
                event.order_id(),
                event.event_type().as_str()
            )));
        }

        self.insert_new(event)
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.events.len())
    }
}

fn stale(kind: &str, id: &str, expected: u64, found: u64) -> AppError {
    AppError::Conflict(format!(
        "{kind} {id} was modified concurrently (expected version {expected}, found {found})"
    ))
}
