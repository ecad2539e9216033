pub mod dto;
pub mod handlers;
pub mod service;
pub mod store;
pub mod types;

use crate::state::AppState;
use axum::Router;

pub use store::{MemoryOrderStore, OrderStore, PgOrderStore};
pub use types::{DeliveryType, Order, OrderItem, OrderStatus};

pub fn router() -> Router<AppState> {
    handlers::router()
}
