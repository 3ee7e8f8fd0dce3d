use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use atrium_core::domain::{ContactRequest, RequestStatus};
use atrium_core::error::RepoError;
use atrium_core::ports::{BaseRepository, ContactRequestRepository, Page};

/// In-memory contact request repository.
pub struct InMemoryContactRequestRepository {
    rows: RwLock<HashMap<Uuid, ContactRequest>>,
}

impl InMemoryContactRequestRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryContactRequestRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<ContactRequest, Uuid> for InMemoryContactRequestRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContactRequest>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, request: ContactRequest) -> Result<ContactRequest, RepoError> {
        self.rows.write().await.insert(request.id, request.clone());
        Ok(request)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ContactRequestRepository for InMemoryContactRequestRepository {
    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<RequestStatus>,
        assigned: Option<bool>,
        assigned_to: Option<Uuid>,
    ) -> Result<Page<ContactRequest>, RepoError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<ContactRequest> = rows
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .filter(|r| assigned.map_or(true, |want| r.assigned_to.is_some() == want))
            .filter(|r| assigned_to.map_or(true, |u| r.assigned_to == Some(u)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn count(&self, status: Option<RequestStatus>) -> Result<u64, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .count() as u64)
    }

    async fn count_unassigned(&self) -> Result<u64, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|r| r.assigned_to.is_none() && r.status != RequestStatus::Deleted)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(subject: &str) -> ContactRequest {
        ContactRequest::new(
            "Jo".into(),
            "jo@example.com".into(),
            subject.into(),
            "please call".into(),
        )
    }

    #[tokio::test]
    async fn assignment_filters() {
        let repo = InMemoryContactRequestRepository::new();
        let staff = Uuid::new_v4();

        let mut assigned = request("quote");
        assigned.assign(staff);
        repo.save(assigned).await.unwrap();
        repo.save(request("complaint")).await.unwrap();

        let unassigned = repo.list(10, 0, None, Some(false), None).await.unwrap();
        assert_eq!(unassigned.total, 1);
        assert_eq!(unassigned.items[0].subject, "complaint");

        let mine = repo.list(10, 0, None, None, Some(staff)).await.unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(repo.count_unassigned().await.unwrap(), 1);
    }
}
