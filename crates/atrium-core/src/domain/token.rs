use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted refresh token. Only the hash of the opaque token is stored;
/// the plaintext leaves the server exactly once, in the issuing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn new(user_id: Uuid, token_hash: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            issued_at: now,
            expires_at: now + ttl,
            revoked_at: None,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }

    pub fn revoke(&mut self) {
        if self.revoked_at.is_none() {
            self.revoked_at = Some(Utc::now());
        }
    }
}

/// Single-use password reset token (hash only, like refresh tokens).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl PasswordResetToken {
    pub fn new(user_id: Uuid, token_hash: String, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            expires_at: Utc::now() + ttl,
            used_at: None,
        }
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_token_lifecycle() {
        let mut token = RefreshToken::new(Uuid::new_v4(), "hash".into(), Duration::days(30));
        let now = Utc::now();
        assert!(token.is_active(now));
        assert!(!token.is_active(now + Duration::days(31)));
        token.revoke();
        assert!(!token.is_active(now));
    }

    #[test]
    fn reset_token_single_use() {
        let mut token = PasswordResetToken::new(Uuid::new_v4(), "hash".into(), Duration::hours(1));
        let now = Utc::now();
        assert!(token.is_usable(now));
        token.used_at = Some(now);
        assert!(!token.is_usable(now));
    }
}
