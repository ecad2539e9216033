use axum::{
    extract::{FromRef, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest,
              ThemePreferenceRequest},
        extractors::CurrentUser,
        is_valid_email,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::{NewUser, Role},
    },
    error::ApiError,
    state::AppState,
};

const THEMES: [&str; 3] = ["light", "dark", "auto"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
        .route("/auth/theme-preference", put(update_theme_preference))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(axum::http::StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::validation("Password too short"));
    }
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Name is required"));
    }

    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            email: payload.email,
            name: payload.name.trim().to_string(),
            password_hash: hash,
            role: Role::Customer,
            phone: payload.phone,
            address: payload.address,
        })
        .await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        axum::http::StatusCode::CREATED,
        Json(AuthResponse {
            token,
            refresh_token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = state
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::Unauthorized("Invalid credentials".into())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    let token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(Json(AuthResponse {
        token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(user), fields(user_id = %user.id))]
async fn me(CurrentUser(user): CurrentUser) -> Result<Json<PublicUser>, ApiError> {
    Ok(Json(PublicUser::from(&user)))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
async fn update_theme_preference(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ThemePreferenceRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if !THEMES.contains(&payload.theme_preference.as_str()) {
        return Err(ApiError::validation("Invalid theme preference"));
    }

    let updated = state
        .users
        .update_theme_preference(user.id, &payload.theme_preference)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(PublicUser::from(&updated)))
}
