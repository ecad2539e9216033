use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{require_role, CurrentUser, Role},
    error::ApiError,
    state::AppState,
};

use super::dto::{CreateMenuItemRequest, MenuQuery, UpdateMenuItemRequest};
use super::repo::{MenuFilter, MenuItem};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/menu", get(list_menu).post(create_menu_item))
        .route(
            "/menu/:id",
            get(get_menu_item)
                .put(update_menu_item)
                .delete(delete_menu_item),
        )
}

/// Public browsing: available items only, optionally narrowed by category.
#[instrument(skip(state))]
async fn list_menu(
    State(state): State<AppState>,
    Query(q): Query<MenuQuery>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    let items = state
        .menu
        .list(MenuFilter {
            available_only: true,
            category: q.category,
        })
        .await?;
    Ok(Json(items))
}

#[instrument(skip(state))]
async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MenuItem>, ApiError> {
    let item = state
        .menu
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Menu item not found"))?;
    Ok(Json(item))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
async fn create_menu_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    require_role(&user, &[Role::Admin])?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    if payload.price < Decimal::ZERO {
        return Err(ApiError::validation("Price must not be negative"));
    }

    let item = state.menu.create(payload.into()).await?;
    info!(item_id = %item.id, name = %item.name, "menu item created");
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
async fn update_menu_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuItemRequest>,
) -> Result<Json<MenuItem>, ApiError> {
    require_role(&user, &[Role::Admin])?;

    if let Some(price) = payload.price {
        if price < Decimal::ZERO {
            return Err(ApiError::validation("Price must not be negative"));
        }
    }

    let item = state
        .menu
        .update(id, payload.into())
        .await?
        .ok_or_else(|| ApiError::not_found("Menu item not found"))?;
    Ok(Json(item))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn delete_menu_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require_role(&user, &[Role::Admin])?;

    if !state.menu.delete(id).await? {
        return Err(ApiError::not_found("Menu item not found"));
    }
    info!(item_id = %id, "menu item deleted");
    Ok(Json(json!({ "message": "Menu item deleted" })))
}
