use async_trait::async_trait;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::debug;

use super::{is_unique_violation, timestamp_to_datetime, ModelError, User, UserRepository};
use crate::password::{hash_password, verify_dummy_password, verify_password};

#[derive(Debug, sqlx::FromRow)]
struct UserRecord {
    id: i64,
    name: String,
    email: String,
    created_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRecord {
    id: i64,
    hashed_password: String,
}

/// User repository backed by the `users` table.
#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn hashed_password_for(&self, id: i64) -> Result<Option<String>, ModelError> {
        let hash = sqlx::query_scalar::<_, String>("SELECT hashed_password FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }
}

#[async_trait]
impl UserRepository for SqliteUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError> {
        let hashed_password = hash_password(password).await?;
        let created_at = OffsetDateTime::now_utc().unix_timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, hashed_password, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(&hashed_password)
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err, "users.email") => Err(ModelError::DuplicateEmail),
            Err(err) => Err(ModelError::Storage(err)),
        }
    }

    async fn get(&self, id: i64) -> Result<User, ModelError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ModelError::NotFound)?;

        Ok(User {
            id: record.id,
            name: record.name,
            email: record.email,
            created: timestamp_to_datetime(record.created_at)?,
        })
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError> {
        let record = sqlx::query_as::<_, CredentialRecord>(
            "SELECT id, hashed_password FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            debug!(target: "models", "authentication attempted for unknown email");
            verify_dummy_password(password).await?;
            return Err(ModelError::InvalidCredentials);
        };

        if verify_password(password, &record.hashed_password).await? {
            Ok(record.id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> Result<bool, ModelError> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists != 0)
    }

    async fn password_update(
        &self,
        id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ModelError> {
        let stored_hash = self
            .hashed_password_for(id)
            .await?
            .ok_or(ModelError::NotFound)?;

        if !verify_password(current_password, &stored_hash).await? {
            return Err(ModelError::InvalidCredentials);
        }

        let new_hash = hash_password(new_password).await?;
        sqlx::query("UPDATE users SET hashed_password = ? WHERE id = ?")
            .bind(&new_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
