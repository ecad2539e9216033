use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{DeliveryType, OrderStatus};

/// One cart line as submitted by the client. The unit price is the
/// point-in-time snapshot the totals are computed from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    #[serde(alias = "menuItem")]
    pub menu_item_id: Uuid,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemInput>,
    pub delivery_type: Option<String>,
    pub delivery_address: Option<String>,
    pub pickup_date_time: Option<String>,
    #[serde(default)]
    pub phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Owner details resolved at read time for staff views and mail
/// dispatch; never persisted on the order.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
}

/// A stored line item enriched with the menu item's current name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDetails {
    pub menu_item_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: u32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

/// Order as returned to clients: the stored record plus best-effort
/// enrichment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<LineDetails>,
    pub delivery_type: DeliveryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_date_time: Option<String>,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub total_price: Decimal,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerInfo>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
