use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

/// Caller role used for access control decisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "customer" => Some(Role::Customer),
            "staff" => Some(Role::Staff),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

/// User record owned by the identity store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub address: String,
    pub theme_preference: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields supplied at registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub address: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new: NewUser) -> anyhow::Result<User>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn update_theme_preference(&self, id: Uuid, theme: &str)
        -> anyhow::Result<Option<User>>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    phone: String,
    address: String,
    theme_preference: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            email: r.email,
            name: r.name,
            password_hash: r.password_hash,
            role: Role::parse(&r.role).unwrap_or(Role::Customer),
            phone: r.phone,
            address: r.address,
            theme_preference: r.theme_preference,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, name, password_hash, role, phone, address, theme_preference, created_at, updated_at";

/// Postgres-backed identity store.
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, role, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(&new.phone)
        .bind(&new.address)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1",
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_theme_preference(
        &self,
        id: Uuid,
        theme: &str,
    ) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET theme_preference = $2, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(theme)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }
}

/// In-memory identity store. Second adapter behind the same contract,
/// also used by `AppState::fake()`.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.lock().expect("user store lock");
        if users.iter().any(|u| u.email == new.email) {
            anyhow::bail!("email already exists");
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            role: new.role,
            phone: new.phone,
            address: new.address,
            theme_preference: "light".into(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().expect("user store lock");
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().expect("user store lock");
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_theme_preference(
        &self,
        id: Uuid,
        theme: &str,
    ) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().expect("user store lock");
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.theme_preference = theme.to_string();
            u.updated_at = OffsetDateTime::now_utc();
            u.clone()
        }))
    }
}
