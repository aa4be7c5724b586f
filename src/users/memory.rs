use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::UserStore;
use super::repo_types::{NewUser, Page, RestrictionStatus, User};

/// In-process store used by the handler tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn page(&self, limit: i64, offset: i64) -> anyhow::Result<Page<User>> {
        let users = self.users.read().await;
        let mut all: Vec<&User> = users.values().collect();
        all.sort_by_key(|u| (u.created_at, u.id));
        let items = all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok(Page {
            items,
            total: users.len() as i64,
        })
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn email_taken(&self, email: &str) -> anyhow::Result<bool> {
        Ok(self.users.read().await.values().any(|u| u.email == email))
    }

    async fn insert(&self, new: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.write().await;
        anyhow::ensure!(
            !users.values().any(|u| u.email == new.email),
            "duplicate key value violates unique constraint \"users_email_key\""
        );
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            lastname: new.lastname,
            email: new.email,
            phone: new.phone,
            password: new.password,
            is_restricted: RestrictionStatus::Valido,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, user: &User) -> anyhow::Result<User> {
        let mut users = self.users.write().await;
        anyhow::ensure!(
            !users.values().any(|u| u.id != user.id && u.email == user.email),
            "duplicate key value violates unique constraint \"users_email_key\""
        );
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| anyhow::anyhow!("no rows returned by a query that expected to return at least one row"))?;
        *stored = User {
            created_by: stored.created_by.clone(),
            created_at: stored.created_at,
            updated_at: OffsetDateTime::now_utc(),
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}
