use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{claims::Role, password::HashedPassword};

/// User record as held by the credential store.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: HashedPassword,
    pub role: Role,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

/// Everything needed to insert a user. `id` and `created_at` come from the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: HashedPassword,
    pub role: Role,
}

/// Raw `users` row.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            email: r.email,
            password: HashedPassword::from_stored(r.password_hash),
            role: r.role.parse()?,
            is_active: r.is_active,
            created_at: r.created_at,
        })
    }
}
