use async_trait::async_trait;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};

use super::{timestamp_to_datetime, ModelError, Snippet, SnippetRepository, LATEST_SNIPPETS_LIMIT};

#[derive(Debug, sqlx::FromRow)]
struct SnippetRecord {
    id: i64,
    title: String,
    content: String,
    created_at: i64,
    expires_at: i64,
}

impl TryFrom<SnippetRecord> for Snippet {
    type Error = ModelError;

    fn try_from(record: SnippetRecord) -> Result<Self, Self::Error> {
        Ok(Snippet {
            id: record.id,
            title: record.title,
            content: record.content,
            created: timestamp_to_datetime(record.created_at)?,
            expires: timestamp_to_datetime(record.expires_at)?,
        })
    }
}

/// Snippet repository backed by the `snippets` table.
#[derive(Clone)]
pub struct SqliteSnippetStore {
    pool: SqlitePool,
}

impl SqliteSnippetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetRepository for SqliteSnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i64,
    ) -> Result<i64, ModelError> {
        let created_at = OffsetDateTime::now_utc();
        let expires_at = created_at + Duration::days(expires_days);

        let result = sqlx::query(
            r#"
            INSERT INTO snippets (title, content, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(created_at.unix_timestamp())
        .bind(expires_at.unix_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> Result<Snippet, ModelError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let record = sqlx::query_as::<_, SnippetRecord>(
            r#"
            SELECT id, title, content, created_at, expires_at
            FROM snippets
            WHERE id = ? AND expires_at > ?
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or(ModelError::NotFound)?.try_into()
    }

    async fn latest(&self) -> Result<Vec<Snippet>, ModelError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();

        sqlx::query_as::<_, SnippetRecord>(
            r#"
            SELECT id, title, content, created_at, expires_at
            FROM snippets
            WHERE expires_at > ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(now)
        .bind(LATEST_SNIPPETS_LIMIT)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Snippet::try_from)
        .collect()
    }
}
