use axum::Router;
use lazy_static::lazy_static;
use regex::Regex;

use crate::{error::ApiError, state::AppState};

pub mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;

pub use extractors::CurrentUser;
pub use repo::{Role, User};

pub fn router() -> Router<AppState> {
    handlers::router()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Single capability check used before every role-gated operation.
pub fn require_role(user: &User, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
