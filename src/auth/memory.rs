use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{
    password::HashedPassword,
    repo::UserStore,
    repo_types::{NewUser, User},
};
use crate::error::StoreError;

/// Process-local store with the same uniqueness rules as the database.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, User>>, StoreError> {
        self.users
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("user map poisoned")))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.lock()?;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password: user.password,
            role: user.role,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_password(&self, id: Uuid, password: &HashedPassword) -> Result<bool, StoreError> {
        Ok(match self.lock()?.get_mut(&id) {
            Some(u) => {
                u.password = password.clone();
                true
            }
            None => false,
        })
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError> {
        Ok(match self.lock()?.get_mut(&id) {
            Some(u) => {
                u.is_active = active;
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.remove(&id).is_some())
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut users = self.lock()?;
        let n = users.len() as u64;
        users.clear();
        Ok(n)
    }
}
