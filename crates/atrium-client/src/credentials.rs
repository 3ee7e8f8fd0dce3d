//! Credential storage: a primary channel and an advisory backup.
//!
//! The primary store models the cookie jar the server writes into; the
//! backup mirrors it so a dropped primary entry does not strand the user
//! logged out. The backup is never authoritative for authorization
//! decisions - it exists solely to reconstruct a primary entry, and
//! mirroring server-held credentials into client-readable storage
//! weakens the isolation the primary channel was chosen for. Embedders
//! that do not want the mirror can plug in a store that drops writes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

/// Slot names tried for the access token, in order. Multiple names stay
/// accepted for compatibility with older server versions.
pub const ACCESS_SLOTS: [&str; 2] = ["auth_token", "auth_token_access"];

/// Slot names tried for the refresh token, in order.
pub const REFRESH_SLOTS: [&str; 2] = ["refresh_token", "refresh_token_access"];

/// Backup slot for the access token.
pub const ACCESS_BACKUP_SLOT: &str = "auth_token_backup";

/// Backup slot for the refresh token.
pub const REFRESH_BACKUP_SLOT: &str = "refresh_token_backup";

/// Backup slot recording when the session last authenticated.
pub const AUTH_TIMESTAMP_SLOT: &str = "auth_timestamp";

/// Errors from a credential store backend.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("credential storage unavailable: {0}")]
    Unavailable(String),
}

/// A named-slot credential store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, slot: &str) -> Result<Option<String>, CredentialError>;

    async fn set(&self, slot: &str, value: &str) -> Result<(), CredentialError>;

    async fn remove(&self, slot: &str) -> Result<(), CredentialError>;
}

/// In-memory credential store.
pub struct InMemoryCredentialStore {
    slots: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, slot: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.slots.read().await.get(slot).cloned())
    }

    async fn set(&self, slot: &str, value: &str) -> Result<(), CredentialError> {
        self.slots
            .write()
            .await
            .insert(slot.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, slot: &str) -> Result<(), CredentialError> {
        self.slots.write().await.remove(slot);
        Ok(())
    }
}

/// A session credential pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            issued_at: Utc::now(),
        }
    }
}

/// Two-channel token store with best-effort synchronization.
#[derive(Clone)]
pub struct TokenStore {
    primary: Arc<dyn CredentialStore>,
    backup: Arc<dyn CredentialStore>,
}

impl TokenStore {
    pub fn new(primary: Arc<dyn CredentialStore>, backup: Arc<dyn CredentialStore>) -> Self {
        Self { primary, backup }
    }

    /// Both channels in memory; the default for native embedders.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(InMemoryCredentialStore::new()),
        )
    }

    async fn read_slots(
        store: &Arc<dyn CredentialStore>,
        slots: &[&str],
    ) -> Option<String> {
        for slot in slots {
            match store.get(slot).await {
                Ok(Some(value)) if !value.is_empty() => return Some(value),
                Ok(_) => {}
                Err(e) => tracing::warn!(slot, error = %e, "Credential read failed"),
            }
        }
        None
    }

    /// Current access token: primary channel first, backup as recovery.
    pub async fn access_token(&self) -> Option<String> {
        if let Some(token) = Self::read_slots(&self.primary, &ACCESS_SLOTS).await {
            return Some(token);
        }
        Self::read_slots(&self.backup, &[ACCESS_BACKUP_SLOT]).await
    }

    /// Current refresh token: primary channel first, backup as recovery.
    pub async fn refresh_token(&self) -> Option<String> {
        if let Some(token) = Self::read_slots(&self.primary, &REFRESH_SLOTS).await {
            return Some(token);
        }
        Self::read_slots(&self.backup, &[REFRESH_BACKUP_SLOT]).await
    }

    /// Persist a fresh pair to both channels and stamp the auth time.
    /// Storage failures are logged, never fatal.
    pub async fn store(&self, pair: &TokenPair) {
        let writes = [
            (&self.primary, ACCESS_SLOTS[0], pair.access_token.as_str()),
            (&self.primary, REFRESH_SLOTS[0], pair.refresh_token.as_str()),
            (&self.backup, ACCESS_BACKUP_SLOT, pair.access_token.as_str()),
            (&self.backup, REFRESH_BACKUP_SLOT, pair.refresh_token.as_str()),
        ];
        for (store, slot, value) in writes {
            if let Err(e) = store.set(slot, value).await {
                tracing::warn!(slot, error = %e, "Credential write failed");
            }
        }
        let stamp = pair.issued_at.timestamp_millis().to_string();
        if let Err(e) = self.backup.set(AUTH_TIMESTAMP_SLOT, &stamp).await {
            tracing::warn!(error = %e, "Auth timestamp write failed");
        }
    }

    /// Remove every known slot from both channels.
    pub async fn clear(&self) {
        for slot in ACCESS_SLOTS.iter().chain(REFRESH_SLOTS.iter()) {
            if let Err(e) = self.primary.remove(slot).await {
                tracing::warn!(slot, error = %e, "Credential remove failed");
            }
        }
        for slot in [ACCESS_BACKUP_SLOT, REFRESH_BACKUP_SLOT, AUTH_TIMESTAMP_SLOT] {
            if let Err(e) = self.backup.remove(slot).await {
                tracing::warn!(slot, error = %e, "Credential remove failed");
            }
        }
    }

    /// Reconcile the two channels in both directions: a backup entry
    /// with no primary counterpart restores the primary, and vice
    /// versa. Side effects only; errors are logged and swallowed.
    pub async fn synchronize(&self) {
        self.reconcile(&ACCESS_SLOTS, ACCESS_BACKUP_SLOT).await;
        self.reconcile(&REFRESH_SLOTS, REFRESH_BACKUP_SLOT).await;
    }

    async fn reconcile(&self, primary_slots: &[&str], backup_slot: &str) {
        let primary = Self::read_slots(&self.primary, primary_slots).await;
        let backup = Self::read_slots(&self.backup, &[backup_slot]).await;

        match (primary, backup) {
            (None, Some(value)) => {
                tracing::debug!(slot = primary_slots[0], "Restoring primary from backup");
                if let Err(e) = self.primary.set(primary_slots[0], &value).await {
                    tracing::warn!(error = %e, "Primary restore failed");
                }
            }
            (Some(value), None) => {
                tracing::debug!(slot = backup_slot, "Backfilling backup from primary");
                if let Err(e) = self.backup.set(backup_slot, &value).await {
                    tracing::warn!(error = %e, "Backup write failed");
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (TokenStore, Arc<InMemoryCredentialStore>, Arc<InMemoryCredentialStore>) {
        let primary = Arc::new(InMemoryCredentialStore::new());
        let backup = Arc::new(InMemoryCredentialStore::new());
        let tokens = TokenStore::new(primary.clone(), backup.clone());
        (tokens, primary, backup)
    }

    #[tokio::test]
    async fn synchronize_restores_primary_from_backup() {
        let (tokens, primary, backup) = store();
        backup.set(REFRESH_BACKUP_SLOT, "r-123").await.unwrap();

        tokens.synchronize().await;

        assert_eq!(
            primary.get(REFRESH_SLOTS[0]).await.unwrap().as_deref(),
            Some("r-123")
        );
    }

    #[tokio::test]
    async fn synchronize_backfills_backup_from_primary() {
        let (tokens, primary, backup) = store();
        primary.set(ACCESS_SLOTS[1], "a-456").await.unwrap();

        tokens.synchronize().await;

        assert_eq!(
            backup.get(ACCESS_BACKUP_SLOT).await.unwrap().as_deref(),
            Some("a-456")
        );
    }

    #[tokio::test]
    async fn alternate_primary_slot_names_are_accepted() {
        let (tokens, primary, _) = store();
        primary.set("refresh_token_access", "r-alt").await.unwrap();

        assert_eq!(tokens.refresh_token().await.as_deref(), Some("r-alt"));
    }

    #[tokio::test]
    async fn store_writes_both_channels_and_timestamp() {
        let (tokens, primary, backup) = store();
        let pair = TokenPair::new("acc", "ref");

        tokens.store(&pair).await;

        assert_eq!(primary.get("auth_token").await.unwrap().as_deref(), Some("acc"));
        assert_eq!(
            backup.get(REFRESH_BACKUP_SLOT).await.unwrap().as_deref(),
            Some("ref")
        );
        assert!(backup.get(AUTH_TIMESTAMP_SLOT).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn clear_empties_both_channels() {
        let (tokens, primary, backup) = store();
        tokens.store(&TokenPair::new("acc", "ref")).await;

        tokens.clear().await;

        assert!(tokens.access_token().await.is_none());
        assert!(tokens.refresh_token().await.is_none());
        assert!(primary.get("auth_token").await.unwrap().is_none());
        assert!(backup.get(AUTH_TIMESTAMP_SLOT).await.unwrap().is_none());
    }

    struct FailingStore;

    #[async_trait]
    impl CredentialStore for FailingStore {
        async fn get(&self, _slot: &str) -> Result<Option<String>, CredentialError> {
            Err(CredentialError::Unavailable("blocked".into()))
        }

        async fn set(&self, _slot: &str, _value: &str) -> Result<(), CredentialError> {
            Err(CredentialError::Unavailable("blocked".into()))
        }

        async fn remove(&self, _slot: &str) -> Result<(), CredentialError> {
            Err(CredentialError::Unavailable("blocked".into()))
        }
    }

    #[tokio::test]
    async fn synchronize_is_best_effort_when_storage_fails() {
        let backup = Arc::new(InMemoryCredentialStore::new());
        backup.set(REFRESH_BACKUP_SLOT, "r-789").await.unwrap();
        let tokens = TokenStore::new(Arc::new(FailingStore), backup);

        // Must not panic or error out.
        tokens.synchronize().await;
        tokens.store(&TokenPair::new("a", "b")).await;

        // Backup still answers reads even though primary is down.
        assert_eq!(tokens.refresh_token().await.as_deref(), Some("b"));
    }
}
