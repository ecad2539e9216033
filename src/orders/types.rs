use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Fixed surcharge applied to delivery orders only.
pub fn delivery_fee(delivery_type: DeliveryType) -> Decimal {
    match delivery_type {
        DeliveryType::Delivery => Decimal::new(500, 2),
        DeliveryType::Pickup => Decimal::ZERO,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    Pickup,
    Delivery,
}

impl DeliveryType {
    pub fn parse(s: &str) -> Option<DeliveryType> {
        match s {
            "pickup" => Some(DeliveryType::Pickup),
            "delivery" => Some(DeliveryType::Delivery),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Pickup => "pickup",
            DeliveryType::Delivery => "delivery",
        }
    }
}

/// Order lifecycle: pending -> preparing -> ready -> delivered, with
/// cancelled reachable from any non-terminal state. Delivered and
/// cancelled are absorbing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "preparing" => Some(OrderStatus::Preparing),
            "ready" => Some(OrderStatus::Ready),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

/// One ordered quantity of a menu item, unit price frozen at order time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub menu_item_id: Uuid,
    pub quantity: u32,
    pub price: Decimal,
}

/// Order record owned end-to-end by the workflow. References users and
/// menu items by identifier only.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub delivery_type: DeliveryType,
    pub delivery_address: Option<String>,
    pub pickup_date_time: Option<String>,
    pub phone: String,
    pub notes: Option<String>,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields persisted when an order is created.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub delivery_type: DeliveryType,
    pub delivery_address: Option<String>,
    pub pickup_date_time: Option<String>,
    pub phone: String,
    pub notes: Option<String>,
    pub total_price: Decimal,
}
