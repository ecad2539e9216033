use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

/// Sentinel category for uncategorized items.
pub const UNCATEGORIZED: &str = "none";

/// Menu item record. Availability gates customer browsing only;
/// historical orders keep referencing unavailable items.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: String,
    pub image_url: Option<String>,
    pub available: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: String,
    pub image_url: Option<String>,
    pub available: bool,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct MenuItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub available: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct MenuFilter {
    pub available_only: bool,
    pub category: Option<String>,
}

#[async_trait]
pub trait MenuStore: Send + Sync {
    /// Items matching the filter, sorted by category then name
    /// (case-insensitive).
    async fn list(&self, filter: MenuFilter) -> anyhow::Result<Vec<MenuItem>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<MenuItem>>;
    async fn create(&self, new: NewMenuItem) -> anyhow::Result<MenuItem>;
    async fn update(&self, id: Uuid, changes: MenuItemChanges) -> anyhow::Result<Option<MenuItem>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

/// Postgres-backed menu store.
pub struct PgMenuStore {
    db: PgPool,
}

impl PgMenuStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MenuStore for PgMenuStore {
    async fn list(&self, filter: MenuFilter) -> anyhow::Result<Vec<MenuItem>> {
        let items = sqlx::query_as::<_, MenuItem>(
            r#"
            SELECT * FROM menu_items
            WHERE ($1 = FALSE OR available = TRUE)
              AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY LOWER(category), LOWER(name)
            "#,
        )
        .bind(filter.available_only)
        .bind(filter.category)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<MenuItem>> {
        let item = sqlx::query_as::<_, MenuItem>("SELECT * FROM menu_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(item)
    }

    async fn create(&self, new: NewMenuItem) -> anyhow::Result<MenuItem> {
        let item = sqlx::query_as::<_, MenuItem>(
            r#"
            INSERT INTO menu_items (name, description, price, category, image_url, available)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(&new.category)
        .bind(&new.image_url)
        .bind(new.available)
        .fetch_one(&self.db)
        .await?;
        Ok(item)
    }

    async fn update(&self, id: Uuid, changes: MenuItemChanges) -> anyhow::Result<Option<MenuItem>> {
        let item = sqlx::query_as::<_, MenuItem>(
            r#"
            UPDATE menu_items SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category = COALESCE($5, category),
                image_url = COALESCE($6, image_url),
                available = COALESCE($7, available),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.category)
        .bind(changes.image_url)
        .bind(changes.available)
        .fetch_optional(&self.db)
        .await?;
        Ok(item)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// In-memory menu store, the second adapter behind the same contract.
#[derive(Default)]
pub struct MemoryMenuStore {
    items: Mutex<Vec<MenuItem>>,
}

fn sort_menu(items: &mut [MenuItem]) {
    items.sort_by(|a, b| {
        let by_category = a.category.to_lowercase().cmp(&b.category.to_lowercase());
        by_category.then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

#[async_trait]
impl MenuStore for MemoryMenuStore {
    async fn list(&self, filter: MenuFilter) -> anyhow::Result<Vec<MenuItem>> {
        let items = self.items.lock().expect("menu store lock");
        let mut matching: Vec<MenuItem> = items
            .iter()
            .filter(|i| !filter.available_only || i.available)
            .filter(|i| filter.category.as_deref().map_or(true, |c| i.category == c))
            .cloned()
            .collect();
        sort_menu(&mut matching);
        Ok(matching)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<MenuItem>> {
        let items = self.items.lock().expect("menu store lock");
        Ok(items.iter().find(|i| i.id == id).cloned())
    }

    async fn create(&self, new: NewMenuItem) -> anyhow::Result<MenuItem> {
        let now = OffsetDateTime::now_utc();
        let item = MenuItem {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            price: new.price,
            category: new.category,
            image_url: new.image_url,
            available: new.available,
            created_at: now,
            updated_at: now,
        };
        self.items.lock().expect("menu store lock").push(item.clone());
        Ok(item)
    }

    async fn update(&self, id: Uuid, changes: MenuItemChanges) -> anyhow::Result<Option<MenuItem>> {
        let mut items = self.items.lock().expect("menu store lock");
        Ok(items.iter_mut().find(|i| i.id == id).map(|item| {
            if let Some(name) = changes.name {
                item.name = name;
            }
            if let Some(description) = changes.description {
                item.description = Some(description);
            }
            if let Some(price) = changes.price {
                item.price = price;
            }
            if let Some(category) = changes.category {
                item.category = category;
            }
            if let Some(image_url) = changes.image_url {
                item.image_url = Some(image_url);
            }
            if let Some(available) = changes.available {
                item.available = available;
            }
            item.updated_at = OffsetDateTime::now_utc();
            item.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut items = self.items.lock().expect("menu store lock");
        let before = items.len();
        items.retain(|i| i.id != id);
        Ok(items.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(store: &MemoryMenuStore, name: &str, category: &str, available: bool) -> MenuItem {
        store
            .create(NewMenuItem {
                name: name.into(),
                description: None,
                price: Decimal::new(1000, 2),
                category: category.into(),
                image_url: None,
                available,
            })
            .await
            .expect("create")
    }

    #[tokio::test]
    async fn list_sorts_by_category_then_name_case_insensitive() {
        let store = MemoryMenuStore::default();
        seed(&store, "teh tarik", "Drinks", true).await;
        seed(&store, "Nasi Lemak", "mains", true).await;
        seed(&store, "Air Bandung", "drinks", true).await;

        let items = store.list(MenuFilter::default()).await.expect("list");
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Air Bandung", "teh tarik", "Nasi Lemak"]);
    }

    #[tokio::test]
    async fn list_filters_unavailable_and_by_category() {
        let store = MemoryMenuStore::default();
        seed(&store, "Roti Canai", "mains", true).await;
        seed(&store, "Sold Out Special", "mains", false).await;
        seed(&store, "Milo Ais", "drinks", true).await;

        let available = store
            .list(MenuFilter {
                available_only: true,
                category: None,
            })
            .await
            .expect("list");
        assert_eq!(available.len(), 2);

        let mains = store
            .list(MenuFilter {
                available_only: true,
                category: Some("mains".into()),
            })
            .await
            .expect("list");
        assert_eq!(mains.len(), 1);
        assert_eq!(mains[0].name, "Roti Canai");
    }

    #[tokio::test]
    async fn update_applies_partial_changes() {
        let store = MemoryMenuStore::default();
        let item = seed(&store, "Laksa", UNCATEGORIZED, true).await;

        let updated = store
            .update(
                item.id,
                MenuItemChanges {
                    price: Some(Decimal::new(1250, 2)),
                    available: Some(false),
                    ..Default::default()
                },
            )
            .await
            .expect("update")
            .expect("found");
        assert_eq!(updated.name, "Laksa");
        assert_eq!(updated.price, Decimal::new(1250, 2));
        assert!(!updated.available);
    }

    #[tokio::test]
    async fn delete_reports_whether_item_existed() {
        let store = MemoryMenuStore::default();
        let item = seed(&store, "Cendol", "desserts", true).await;
        assert!(store.delete(item.id).await.expect("delete"));
        assert!(!store.delete(item.id).await.expect("delete"));
    }
}
