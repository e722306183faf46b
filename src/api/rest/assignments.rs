use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::observed;
use crate::error::AppError;
use crate::models::assignment::Assignment;
use crate::models::ids::{AccountId, AssignmentId, OrderId};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/assignments", post(offer_assignment).get(list_assignments))
        .route("/assignments/:id", get(get_assignment))
        .route("/assignments/:id/accept", put(accept_assignment))
        .route("/assignments/:id/reject", put(reject_assignment))
}

#[derive(Deserialize)]
pub struct OfferAssignmentRequest {
    pub order_id: String,
    pub courier_id: String,
}

#[derive(Deserialize)]
pub struct ListAssignmentsQuery {
    pub order_id: Option<String>,
    pub courier_id: Option<String>,
}

async fn offer_assignment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OfferAssignmentRequest>,
) -> Result<Json<Assignment>, AppError> {
    let order_id = OrderId::new(&payload.order_id)?;
    let courier_id = AccountId::new(&payload.courier_id)?;

    let assignment = observed(
        &state,
        "offer_assignment",
        state.offer_assignment().execute(&order_id, &courier_id),
    )
    .await?;
    Ok(Json(assignment))
}

async fn get_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Assignment>, AppError> {
    let id = AssignmentId::new(id)?;
    let assignment = state
        .assignments
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("assignment {id} not found")))?;

    Ok(Json(assignment))
}

async fn list_assignments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAssignmentsQuery>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    let assignments = match (query.order_id, query.courier_id) {
        (Some(order_id), None) => {
            state
                .assignments
                .find_by_order(&OrderId::new(order_id)?)
                .await?
        }
        (None, Some(courier_id)) => {
            state
                .assignments
                .find_by_courier(&AccountId::new(courier_id)?)
                .await?
        }
        (Some(order_id), Some(courier_id)) => {
            let courier_id = AccountId::new(courier_id)?;
            state
                .assignments
                .find_by_order(&OrderId::new(order_id)?)
                .await?
                .into_iter()
                .filter(|assignment| assignment.courier_id() == &courier_id)
                .collect()
        }
        (None, None) => {
            return Err(AppError::Validation(
                "either order_id or courier_id must be given".to_string(),
            ));
        }
    };

    Ok(Json(assignments))
}

async fn accept_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Assignment>, AppError> {
    let id = AssignmentId::new(id)?;
    let assignment = observed(
        &state,
        "accept_assignment",
        state.accept_assignment().execute(&id),
    )
    .await?;
    Ok(Json(assignment))
}

async fn reject_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Assignment>, AppError> {
    let id = AssignmentId::new(id)?;
    let assignment = observed(
        &state,
        "reject_assignment",
        state.reject_assignment().execute(&id),
    )
    .await?;
    Ok(Json(assignment))
}
