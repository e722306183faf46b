use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::ids::AccountId;
use crate::models::value::AccountName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    Shipper,
    Courier,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Shipper => "SHIPPER",
            AccountRole::Courier => "COURIER",
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "SHIPPER" => Ok(AccountRole::Shipper),
            "COURIER" => Ok(AccountRole::Courier),
            other => Err(AppError::Validation(format!(
                "unknown account role: {other}, expected SHIPPER/COURIER"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    id: AccountId,
    name: AccountName,
    role: AccountRole,
    created_at: DateTime<Utc>,
}

impl Account {
    pub fn open(name: AccountName, role: AccountRole) -> Self {
        Self {
            id: AccountId::generate(),
            name,
            role,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn name(&self) -> &AccountName {
        &self.name
    }

    pub fn role(&self) -> AccountRole {
        self.role
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_codes_round_trip() {
        assert_eq!("SHIPPER".parse::<AccountRole>().unwrap(), AccountRole::Shipper);
        assert_eq!(" COURIER ".parse::<AccountRole>().unwrap(), AccountRole::Courier);
        assert!("ADMIN".parse::<AccountRole>().is_err());
    }

    #[test]
    fn opened_account_gets_fresh_id() {
        let name = AccountName::new("Ada").unwrap();
        let a = Account::open(name.clone(), AccountRole::Shipper);
        let b = Account::open(name, AccountRole::Shipper);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name().as_str(), "Ada");
    }
}
