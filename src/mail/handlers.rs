use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use anyhow::anyhow;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{require_role, CurrentUser, Role},
    error::ApiError,
    orders,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/email/test", post(send_test_email))
        .route("/email/resend-receipt/:order_id", post(resend_receipt))
}

#[derive(Debug, Deserialize)]
struct TestEmailRequest {
    to: String,
    subject: String,
    message: String,
}

/// Development helper: send an arbitrary email. Admin only.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
async fn send_test_email(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<TestEmailRequest>,
) -> Result<Json<Value>, ApiError> {
    require_role(&user, &[Role::Admin])?;

    if payload.to.is_empty() || payload.subject.is_empty() || payload.message.is_empty() {
        return Err(ApiError::validation(
            "Missing required fields: to, subject, message",
        ));
    }

    state
        .mailer
        .send_test(&payload.to, &payload.subject, &payload.message)
        .await
        .map_err(|e| ApiError::Internal(anyhow!("failed to send test email: {e}")))?;

    Ok(Json(json!({ "message": "Test email sent successfully" })))
}

/// Resend the receipt for an existing order. Unlike order-flow dispatch
/// the send is the operation itself, so failure surfaces to the caller.
#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn resend_receipt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let order = orders::service::get_order(&state, &user, order_id).await?;

    state
        .mailer
        .send_order_receipt(&order)
        .await
        .map_err(|e| ApiError::Internal(anyhow!("failed to resend order receipt: {e}")))?;

    Ok(Json(json!({ "message": "Order receipt resent successfully" })))
}
