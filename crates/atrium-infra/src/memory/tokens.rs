use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use atrium_core::domain::{PasswordResetToken, RefreshToken};
use atrium_core::error::RepoError;
use atrium_core::ports::{PasswordResetTokenRepository, RefreshTokenRepository};

/// In-memory refresh token repository.
pub struct InMemoryRefreshTokenRepository {
    rows: RwLock<HashMap<Uuid, RefreshToken>>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRefreshTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn save(&self, token: RefreshToken) -> Result<RefreshToken, RepoError> {
        self.rows.write().await.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn revoke(&self, id: Uuid) -> Result<(), RepoError> {
        let mut rows = self.rows.write().await;
        let token = rows.get_mut(&id).ok_or(RepoError::NotFound)?;
        token.revoke();
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let mut rows = self.rows.write().await;
        let mut revoked = 0;
        for token in rows.values_mut() {
            if token.user_id == user_id && token.revoked_at.is_none() {
                token.revoke();
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, t| t.expires_at > now);
        Ok((before - rows.len()) as u64)
    }
}

/// In-memory password reset token repository.
pub struct InMemoryPasswordResetTokenRepository {
    rows: RwLock<HashMap<Uuid, PasswordResetToken>>,
}

impl InMemoryPasswordResetTokenRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPasswordResetTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PasswordResetTokenRepository for InMemoryPasswordResetTokenRepository {
    async fn save(&self, token: PasswordResetToken) -> Result<PasswordResetToken, RepoError> {
        self.rows.write().await.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn mark_used(&self, id: Uuid) -> Result<(), RepoError> {
        let mut rows = self.rows.write().await;
        let token = rows.get_mut(&id).ok_or(RepoError::NotFound)?;
        token.used_at = Some(Utc::now());
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, t| t.expires_at > now);
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn revoke_all_and_purge() {
        let repo = InMemoryRefreshTokenRepository::new();
        let user = Uuid::new_v4();
        repo.save(RefreshToken::new(user, "h1".into(), Duration::days(30)))
            .await
            .unwrap();
        repo.save(RefreshToken::new(user, "h2".into(), Duration::days(30)))
            .await
            .unwrap();
        repo.save(RefreshToken::new(Uuid::new_v4(), "h3".into(), Duration::days(30)))
            .await
            .unwrap();

        assert_eq!(repo.revoke_all_for_user(user).await.unwrap(), 2);
        let revoked = repo.find_by_hash("h1").await.unwrap().unwrap();
        assert!(revoked.revoked_at.is_some());

        let purged = repo
            .purge_expired(Utc::now() + Duration::days(31))
            .await
            .unwrap();
        assert_eq!(purged, 3);
    }

    #[tokio::test]
    async fn reset_tokens_are_single_use() {
        let repo = InMemoryPasswordResetTokenRepository::new();
        let token = repo
            .save(PasswordResetToken::new(
                Uuid::new_v4(),
                "rh".into(),
                Duration::hours(1),
            ))
            .await
            .unwrap();

        repo.mark_used(token.id).await.unwrap();
        let used = repo.find_by_hash("rh").await.unwrap().unwrap();
        assert!(!used.is_usable(Utc::now()));
    }
}
