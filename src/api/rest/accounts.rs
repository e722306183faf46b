use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::observed;
use crate::error::AppError;
use crate::models::account::{Account, AccountRole};
use crate::models::ids::AccountId;
use crate::models::value::AccountName;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/:id", get(get_account))
}

#[derive(Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct ListAccountsQuery {
    pub role: String,
}

async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    let name = AccountName::new(&payload.name)?;
    let role: AccountRole = payload.role.parse()?;

    let account = observed(&state, "create_account", state.create_account().execute(name, role))
        .await?;
    Ok(Json(account))
}

async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Account>, AppError> {
    let id = AccountId::new(id)?;
    let account = state
        .accounts
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {id} not found")))?;

    Ok(Json(account))
}

async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<Vec<Account>>, AppError> {
    let role: AccountRole = query.role.parse()?;
    Ok(Json(state.accounts.find_by_role(role).await?))
}
