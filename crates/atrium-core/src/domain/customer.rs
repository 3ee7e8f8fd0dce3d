use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityStatus;

/// Customer entity - a CRM contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: String, email: String, phone: Option<String>, company: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            company,
            status: EntityStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Free-form note attached to a customer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerNote {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl CustomerNote {
    pub fn new(customer_id: Uuid, author_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            author_id,
            content,
            created_at: Utc::now(),
        }
    }
}
