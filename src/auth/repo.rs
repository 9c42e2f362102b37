use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    password::HashedPassword,
    repo_types::{NewUser, User, UserRow},
};
use crate::error::StoreError;

/// Persistent collection of user records keyed by a unique email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::DuplicateEmail`] when the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    /// Returns `false` when no such user exists.
    async fn update_password(&self, id: Uuid, password: &HashedPassword) -> Result<bool, StoreError>;
    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Removes every record, returning how many were deleted.
    async fn delete_all(&self) -> Result<u64, StoreError>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, is_active, created_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.password.as_str())
        .bind(user.role.as_str())
        .fetch_one(&self.db)
        .await?;
        Ok(User::try_from(row)?)
    }

    async fn update_password(&self, id: Uuid, password: &HashedPassword) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password.as_str())
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM users").execute(&self.db).await?;
        Ok(res.rows_affected())
    }
}
