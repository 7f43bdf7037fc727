//! In-memory repositories with the same observable behaviour as the SQLite ones.

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use super::{ModelError, Snippet, SnippetRepository, User, UserRepository, LATEST_SNIPPETS_LIMIT};
use crate::password::{hash_password, verify_dummy_password, verify_password};

/// Rows in insertion order plus the last id handed out. Ids are never reused, even after removal.
struct Table<T> {
    rows: Vec<T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
pub struct MemorySnippetStore {
    snippets: RwLock<Table<Snippet>>,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnippetRepository for MemorySnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i64,
    ) -> Result<i64, ModelError> {
        let mut snippets = self.snippets.write().await;
        let id = snippets.next_id();
        let created = OffsetDateTime::now_utc();

        snippets.rows.push(Snippet {
            id,
            title: title.to_owned(),
            content: content.to_owned(),
            created,
            expires: created + Duration::days(expires_days),
        });

        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Snippet, ModelError> {
        let now = OffsetDateTime::now_utc();
        self.snippets
            .read()
            .await
            .rows
            .iter()
            .find(|snippet| snippet.id == id && snippet.expires > now)
            .cloned()
            .ok_or(ModelError::NotFound)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, ModelError> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .snippets
            .read()
            .await
            .rows
            .iter()
            .rev()
            .filter(|snippet| snippet.expires > now)
            .take(LATEST_SNIPPETS_LIMIT as usize)
            .cloned()
            .collect())
    }
}

struct StoredUser {
    user: User,
    hashed_password: String,
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Table<StoredUser>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop an account, as an administrator might do out of band.
    pub async fn remove(&self, id: i64) -> bool {
        let mut users = self.users.write().await;
        let before = users.rows.len();
        users.rows.retain(|stored| stored.user.id != id);
        users.rows.len() != before
    }
}

#[async_trait]
impl UserRepository for MemoryUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError> {
        let hashed_password = hash_password(password).await?;
        let mut users = self.users.write().await;

        if users.rows.iter().any(|stored| stored.user.email == email) {
            return Err(ModelError::DuplicateEmail);
        }

        let id = users.next_id();
        users.rows.push(StoredUser {
            user: User {
                id,
                name: name.to_owned(),
                email: email.to_owned(),
                created: OffsetDateTime::now_utc(),
            },
            hashed_password,
        });

        Ok(())
    }

    async fn get(&self, id: i64) -> Result<User, ModelError> {
        self.users
            .read()
            .await
            .rows
            .iter()
            .find(|stored| stored.user.id == id)
            .map(|stored| stored.user.clone())
            .ok_or(ModelError::NotFound)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError> {
        let credentials = self
            .users
            .read()
            .await
            .rows
            .iter()
            .find(|stored| stored.user.email == email)
            .map(|stored| (stored.user.id, stored.hashed_password.clone()));

        let Some((id, hashed_password)) = credentials else {
            verify_dummy_password(password).await?;
            return Err(ModelError::InvalidCredentials);
        };

        if verify_password(password, &hashed_password).await? {
            Ok(id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> Result<bool, ModelError> {
        Ok(self
            .users
            .read()
            .await
            .rows
            .iter()
            .any(|stored| stored.user.id == id))
    }

    async fn password_update(
        &self,
        id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ModelError> {
        let stored_hash = self
            .users
            .read()
            .await
            .rows
            .iter()
            .find(|stored| stored.user.id == id)
            .map(|stored| stored.hashed_password.clone())
            .ok_or(ModelError::NotFound)?;

        if !verify_password(current_password, &stored_hash).await? {
            return Err(ModelError::InvalidCredentials);
        }

        let new_hash = hash_password(new_password).await?;
        let mut users = self.users.write().await;
        let stored = users
            .rows
            .iter_mut()
            .find(|stored| stored.user.id == id)
            .ok_or(ModelError::NotFound)?;
        stored.hashed_password = new_hash;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snippets_expire_and_order_newest_first() {
        let store = MemorySnippetStore::new();
        let expired = store.insert("today", "body", 0).await.unwrap();
        for n in 0..11 {
            store.insert(&format!("live {n}"), "body", 7).await.unwrap();
        }

        assert!(matches!(store.get(expired).await, Err(ModelError::NotFound)));

        let latest = store.latest().await.unwrap();
        assert_eq!(latest.len(), 10);
        assert_eq!(latest[0].title, "live 10");
        assert!(latest.iter().all(|snippet| snippet.id != expired));
    }

    #[tokio::test]
    async fn users_behave_like_the_sqlite_store() {
        let store = MemoryUserStore::new();
        store.insert("Bob", "bob@example.com", "longenough1").await.unwrap();

        assert!(matches!(
            store.insert("Bob2", "bob@example.com", "longenough2").await,
            Err(ModelError::DuplicateEmail)
        ));

        let id = store.authenticate("bob@example.com", "longenough1").await.unwrap();
        assert!(store.exists(id).await.unwrap());
        assert_eq!(store.get(id).await.unwrap().name, "Bob");
        assert!(matches!(
            store.authenticate("bob@example.com", "nope").await,
            Err(ModelError::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate("ghost@example.com", "longenough1").await,
            Err(ModelError::InvalidCredentials)
        ));

        assert!(store.remove(id).await);
        assert!(!store.exists(id).await.unwrap());
        assert!(matches!(store.get(id).await, Err(ModelError::NotFound)));
    }

    #[tokio::test]
    async fn removed_user_ids_are_never_reassigned() {
        let store = MemoryUserStore::new();
        store.insert("Ann", "ann@example.com", "longenough1").await.unwrap();
        store.insert("Ben", "ben@example.com", "longenough2").await.unwrap();
        let ben = store.authenticate("ben@example.com", "longenough2").await.unwrap();
        assert_eq!(ben, 2);

        assert!(store.remove(ben).await);
        store.insert("Cat", "cat@example.com", "longenough3").await.unwrap();
        let cat = store.authenticate("cat@example.com", "longenough3").await.unwrap();

        assert_eq!(cat, 3);
        assert!(!store.exists(ben).await.unwrap());
        assert!(matches!(store.get(ben).await, Err(ModelError::NotFound)));
    }
}
