use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RequestStatus;

/// Inbound contact request from the public website.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub status: RequestStatus,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactRequest {
    pub fn new(name: String, email: String, subject: String, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            subject,
            body,
            status: RequestStatus::New,
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Assigning moves a fresh request into progress.
    pub fn assign(&mut self, user_id: Uuid) {
        self.assigned_to = Some(user_id);
        if self.status == RequestStatus::New {
            self.status = RequestStatus::InProgress;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_promotes_new_to_in_progress() {
        let mut req = ContactRequest::new(
            "Jo Doe".into(),
            "jo@example.com".into(),
            "Quote".into(),
            "Please call back".into(),
        );
        let staff = Uuid::new_v4();
        req.assign(staff);
        assert_eq!(req.assigned_to, Some(staff));
        assert_eq!(req.status, RequestStatus::InProgress);

        req.status = RequestStatus::Resolved;
        req.assign(staff);
        assert_eq!(req.status, RequestStatus::Resolved);
    }
}
