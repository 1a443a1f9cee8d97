/*
 * Responsibility
 * - User storage behind an injected trait (handlers never see a concrete
 *   store); the in-memory implementation backs tests and local runs
 * - Store errors are mapped into the AppError taxonomy by callers
 */
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub user_name: Option<String>,
    pub email: Option<String>,
    // Tri-state:
    // - None: do not update
    // - Some(None): clear
    // - Some(Some(v)): set v
    pub image_url: Option<Option<String>>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.user_name.is_none() && self.email.is_none() && self.image_url.is_none()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a user with email '{0}' already exists")]
    DuplicateEmail(String),
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        let mut rows: Vec<User> = users.values().cloned().collect();
        rows.sort_by_key(|u| u.created_at);
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(StoreError::DuplicateEmail(new.email));
        }

        let user = User {
            id: Uuid::new_v4(),
            user_name: new.user_name,
            email: new.email,
            image_url: new.image_url,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;

        if let Some(email) = &changes.email
            && users
                .values()
                .any(|u| u.id != id && u.email.eq_ignore_ascii_case(email))
        {
            return Err(StoreError::DuplicateEmail(email.clone()));
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = changes.user_name {
            user.user_name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(image_url) = changes.image_url {
            user.image_url = image_url;
        }

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            user_name: name.to_string(),
            email: email.to_string(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn create_get_update_delete_round_trip() {
        let store = InMemoryUserStore::new();

        let created = store.create(new_user("alice", "alice@example.com")).await.unwrap();
        assert_eq!(store.get(created.id).await.unwrap().unwrap().user_name, "alice");

        let updated = store
            .update(
                created.id,
                UserChanges {
                    user_name: Some("alice2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.user_name, "alice2");
        assert_eq!(updated.email, "alice@example.com");

        assert!(store.delete(created.id).await.unwrap());
        assert!(store.get(created.id).await.unwrap().is_none());
        assert!(!store.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = InMemoryUserStore::new();
        store.create(new_user("a", "a@example.com")).await.unwrap();

        let err = store.create(new_user("b", "A@Example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn image_url_tri_state_update() {
        let store = InMemoryUserStore::new();
        let user = store
            .create(NewUser {
                user_name: "a".into(),
                email: "a@example.com".into(),
                image_url: Some("https://img".into()),
            })
            .await
            .unwrap();

        // None: untouched
        let kept = store
            .update(user.id, UserChanges::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.image_url.as_deref(), Some("https://img"));

        // Some(None): cleared
        let cleared = store
            .update(
                user.id,
                UserChanges {
                    image_url: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(cleared.image_url.is_none());
    }
}
