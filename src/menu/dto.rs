use rust_decimal::Decimal;
use serde::Deserialize;

use super::repo::{MenuItemChanges, NewMenuItem, UNCATEGORIZED};

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub available: Option<bool>,
}

impl From<CreateMenuItemRequest> for NewMenuItem {
    fn from(r: CreateMenuItemRequest) -> Self {
        NewMenuItem {
            name: r.name,
            description: r.description,
            price: r.price,
            category: r.category.unwrap_or_else(|| UNCATEGORIZED.into()),
            image_url: r.image_url,
            available: r.available.unwrap_or(true),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub available: Option<bool>,
}

impl From<UpdateMenuItemRequest> for MenuItemChanges {
    fn from(r: UpdateMenuItemRequest) -> Self {
        MenuItemChanges {
            name: r.name,
            description: r.description,
            price: r.price,
            category: r.category,
            image_url: r.image_url,
            available: r.available,
        }
    }
}
