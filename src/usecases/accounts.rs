use std::sync::Arc;

use tracing::info;

use crate::error::AppError;
use crate::models::account::{Account, AccountRole};
use crate::models::value::AccountName;
use crate::repository::AccountRepository;

pub struct CreateAccount {
    accounts: Arc<dyn AccountRepository>,
}

impl CreateAccount {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    pub async fn execute(&self, name: AccountName, role: AccountRole) -> Result<Account, AppError> {
        let account = self.accounts.save(Account::open(name, role)).await?;

        info!(account_id = %account.id(), role = %account.role(), "account created");
        Ok(account)
    }
}
