mod handlers;
pub mod mailer;
pub mod templates;

use crate::state::AppState;
use axum::Router;

pub use mailer::{MailError, Mailer, NoopMailer, SmtpMailer};

pub fn router() -> Router<AppState> {
    handlers::router()
}
