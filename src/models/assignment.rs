use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::ids::{AccountId, AssignmentId, OrderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "PENDING",
            AssignmentStatus::Accepted => "ACCEPTED",
            AssignmentStatus::Rejected => "REJECTED",
            AssignmentStatus::Completed => "COMPLETED",
            AssignmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AssignmentStatus::Pending | AssignmentStatus::Accepted)
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "PENDING" => Ok(AssignmentStatus::Pending),
            "ACCEPTED" => Ok(AssignmentStatus::Accepted),
            "REJECTED" => Ok(AssignmentStatus::Rejected),
            "COMPLETED" => Ok(AssignmentStatus::Completed),
            "CANCELLED" => Ok(AssignmentStatus::Cancelled),
            other => Err(AppError::Validation(format!(
                "unknown assignment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    id: AssignmentId,
    order_id: OrderId,
    courier_id: AccountId,
    status: AssignmentStatus,
    offered_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Assignment {
    pub fn offer(order_id: OrderId, courier_id: AccountId) -> Self {
        Self {
            id: AssignmentId::generate(),
            order_id,
            courier_id,
            status: AssignmentStatus::Pending,
            offered_at: Utc::now(),
            responded_at: None,
            version: 0,
        }
    }

    pub fn id(&self) -> &AssignmentId {
        &self.id
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn courier_id(&self) -> &AccountId {
        &self.courier_id
    }

    pub fn status(&self) -> AssignmentStatus {
        self.status
    }

    pub fn offered_at(&self) -> DateTime<Utc> {
        self.offered_at
    }

    pub fn responded_at(&self) -> Option<DateTime<Utc>> {
        self.responded_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Copies status fields from an earlier snapshot, keeping the current
    /// version so the restore can go through a normal `update`.
    pub(crate) fn restore_from(&mut self, snapshot: &Assignment) {
        self.status = snapshot.status;
        self.responded_at = snapshot.responded_at;
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn accept(&mut self) -> Result<(), AppError> {
        self.require(AssignmentStatus::Pending, "accepted")?;
        self.status = AssignmentStatus::Accepted;
        self.responded_at = Some(Utc::now());
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), AppError> {
        self.require(AssignmentStatus::Pending, "rejected")?;
        self.status = AssignmentStatus::Rejected;
        self.responded_at = Some(Utc::now());
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), AppError> {
        self.require(AssignmentStatus::Accepted, "completed")?;
        self.status = AssignmentStatus::Completed;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), AppError> {
        if self.status == AssignmentStatus::Completed {
            return Err(AppError::InvalidState(
                "assignment cannot be cancelled; it has already been completed".to_string(),
            ));
        }
        self.status = AssignmentStatus::Cancelled;
        Ok(())
    }

    fn require(&self, required: AssignmentStatus, action: &str) -> Result<(), AppError> {
        if self.status != required {
            return Err(AppError::InvalidState(format!(
                "assignment cannot be {action}; required status {required}, current status {}",
                self.status
            )));
        }
        Ok(())
    }
}
