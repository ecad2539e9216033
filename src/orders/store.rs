use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool};
use std::sync::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{DeliveryType, NewOrder, Order, OrderItem, OrderStatus};

/// Storage contract the order workflow is written against. The Postgres
/// and in-memory adapters both satisfy it; the workflow never sees
/// which one it runs on.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, new: NewOrder) -> anyhow::Result<Order>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Order>>;
    async fn list_all(&self) -> anyhow::Result<Vec<Order>>;
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>>;
    /// Persist a new status; returns the updated order, or None when absent.
    async fn update_status(&self, id: Uuid, status: OrderStatus)
        -> anyhow::Result<Option<Order>>;
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    items: Json<Vec<OrderItem>>,
    delivery_type: String,
    delivery_address: Option<String>,
    pickup_date_time: Option<String>,
    phone: String,
    notes: Option<String>,
    total_price: Decimal,
    status: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        Order {
            id: r.id,
            user_id: r.user_id,
            items: r.items.0,
            delivery_type: DeliveryType::parse(&r.delivery_type)
                .unwrap_or(DeliveryType::Delivery),
            delivery_address: r.delivery_address,
            pickup_date_time: r.pickup_date_time,
            phone: r.phone,
            notes: r.notes,
            total_price: r.total_price,
            status: OrderStatus::parse(&r.status).unwrap_or(OrderStatus::Pending),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Postgres-backed order store. Line items live in a JSONB column so
/// creation and status changes stay single-row writes.
pub struct PgOrderStore {
    db: PgPool,
}

impl PgOrderStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, new: NewOrder) -> anyhow::Result<Order> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders
                (user_id, items, delivery_type, delivery_address, pickup_date_time,
                 phone, notes, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(Json(&new.items))
        .bind(new.delivery_type.as_str())
        .bind(&new.delivery_address)
        .bind(&new.pickup_date_time)
        .bind(&new.phone)
        .bind(&new.notes)
        .bind(new.total_price)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Order>> {
        let rows =
            sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC")
                .fetch_all(&self.db)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> anyhow::Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE orders SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }
}

/// In-memory order store, the second adapter behind the same contract.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<Vec<Order>>,
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, new: NewOrder) -> anyhow::Result<Order> {
        let now = OffsetDateTime::now_utc();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            items: new.items,
            delivery_type: new.delivery_type,
            delivery_address: new.delivery_address,
            pickup_date_time: new.pickup_date_time,
            phone: new.phone,
            notes: new.notes,
            total_price: new.total_price,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.orders
            .lock()
            .expect("order store lock")
            .push(order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Order>> {
        let orders = self.orders.lock().expect("order store lock");
        Ok(orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Order>> {
        let orders = self.orders.lock().expect("order store lock");
        let mut all: Vec<Order> = orders.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
        let orders = self.orders.lock().expect("order store lock");
        let mut mine: Vec<Order> = orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> anyhow::Result<Option<Order>> {
        let mut orders = self.orders.lock().expect("order store lock");
        Ok(orders.iter_mut().find(|o| o.id == id).map(|order| {
            order.status = status;
            order.updated_at = OffsetDateTime::now_utc();
            order.clone()
        }))
    }
}
