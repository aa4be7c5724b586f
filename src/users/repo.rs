use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::repo_types::{NewUser, Page, User, UserRow};

const USER_COLUMNS: &str = "id, name, lastname, email, phone, password, is_restricted, \
                            created_by, created_at, updated_at";

/// Persistence seam for the `users` table. Every method is a single,
/// independently atomic store call.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn page(&self, limit: i64, offset: i64) -> anyhow::Result<Page<User>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn email_taken(&self, email: &str) -> anyhow::Result<bool>;
    async fn insert(&self, user: NewUser) -> anyhow::Result<User>;
    /// Writes every mutable column of `user` and refreshes `updated_at`.
    async fn save(&self, user: &User) -> anyhow::Result<User>;
    /// Returns `false` when no row matched.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self))]
    async fn page(&self, limit: i64, offset: i64) -> anyhow::Result<Page<User>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("count users")?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("list users")?;

        let items = rows
            .into_iter()
            .map(User::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    #[instrument(skip(self))]
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user")?;
        row.map(User::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn email_taken(&self, email: &str) -> anyhow::Result<bool> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context("check email uniqueness")?;
        Ok(taken)
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn insert(&self, user: NewUser) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, lastname, email, phone, password, is_restricted, created_by)
            VALUES ($1, $2, $3, $4, $5, 'Valido', $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password)
        .bind(&user.created_by)
        .fetch_one(&self.pool)
        .await
        .context("insert user")?;
        User::try_from(row)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn save(&self, user: &User) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET name = $2, lastname = $3, email = $4, phone = $5,
                   password = $6, is_restricted = $7, updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password)
        .bind(user.is_restricted.as_str())
        .fetch_one(&self.pool)
        .await
        .context("update user")?;
        User::try_from(row)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }
}
