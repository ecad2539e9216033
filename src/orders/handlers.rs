use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{require_role, CurrentUser, Role},
    error::ApiError,
    state::AppState,
};

use super::dto::{CreateOrderRequest, OrderDetails, UpdateStatusRequest};
use super::service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", patch(update_status))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetails>), ApiError> {
    let details = service::create_order(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<OrderDetails>>, ApiError> {
    let orders = service::list_orders(&state, &user).await?;
    Ok(Json(orders))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order = service::get_order(&state, &user, id).await?;
    Ok(Json(order))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<OrderDetails>, ApiError> {
    require_role(&user, &[Role::Staff, Role::Admin])?;
    let order = service::update_status(&state, id, &payload.status).await?;
    Ok(Json(order))
}
