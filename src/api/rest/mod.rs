pub mod accounts;
pub mod assignments;
pub mod orders;
pub mod ws;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(accounts::router())
        .merge(orders::router())
        .merge(assignments::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Runs a use case, recording its latency and outcome.
pub(crate) async fn observed<T, F>(
    state: &AppState,
    use_case: &'static str,
    operation: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    let started = Instant::now();
    let result = operation.await;
    state.metrics.observe(use_case, started, &result);

    if let Err(err) = &result {
        warn!(use_case, kind = err.kind(), error = %err, "use case failed");
    }

    result
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    accounts: usize,
    orders: usize,
    assignments: usize,
    events: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    Ok(Json(HealthResponse {
        status: "ok",
        accounts: state.accounts.count().await?,
        orders: state.orders.count().await?,
        assignments: state.assignments.count().await?,
        events: state.events.count().await?,
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.assignments.count_active().await {
        Ok(active) => state.metrics.active_assignments.set(active as i64),
        Err(err) => warn!(error = %err, "failed to count active assignments"),
    }

    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
