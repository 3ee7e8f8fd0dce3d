use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use atrium_core::domain::{Customer, CustomerNote, EntityStatus};
use atrium_core::error::RepoError;
use atrium_core::ports::{BaseRepository, CustomerRepository, Page};

/// In-memory customer repository.
pub struct InMemoryCustomerRepository {
    rows: RwLock<HashMap<Uuid, Customer>>,
    notes: RwLock<Vec<CustomerNote>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            notes: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryCustomerRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Customer, Uuid> for InMemoryCustomerRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, customer: Customer) -> Result<Customer, RepoError> {
        self.rows.write().await.insert(customer.id, customer.clone());
        Ok(customer)
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
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<EntityStatus>,
    ) -> Result<Page<Customer>, RepoError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<Customer> = rows
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
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

    async fn count(&self, status: Option<EntityStatus>) -> Result<u64, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .count() as u64)
    }

    async fn add_note(&self, note: CustomerNote) -> Result<CustomerNote, RepoError> {
        if !self.rows.read().await.contains_key(&note.customer_id) {
            return Err(RepoError::NotFound);
        }
        self.notes.write().await.push(note.clone());
        Ok(note)
    }

    async fn notes_for(&self, customer_id: Uuid) -> Result<Vec<CustomerNote>, RepoError> {
        let notes = self.notes.read().await;
        Ok(notes
            .iter()
            .filter(|n| n.customer_id == customer_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(name: &str) -> Customer {
        Customer::new(name.into(), format!("{name}@example.com"), None, None)
    }

    #[tokio::test]
    async fn list_paginates_and_filters() {
        let repo = InMemoryCustomerRepository::new();
        for i in 0..5 {
            repo.save(customer(&format!("c{i}"))).await.unwrap();
        }
        let mut gone = customer("gone");
        gone.status = EntityStatus::Deleted;
        repo.save(gone).await.unwrap();

        let page = repo.list(2, 0, Some(EntityStatus::Active)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 5);

        let rest = repo.list(10, 4, Some(EntityStatus::Active)).await.unwrap();
        assert_eq!(rest.items.len(), 1);
    }

    #[tokio::test]
    async fn notes_require_existing_customer() {
        let repo = InMemoryCustomerRepository::new();
        let saved = repo.save(customer("acme")).await.unwrap();

        let note = CustomerNote::new(saved.id, Uuid::new_v4(), "called back".into());
        repo.add_note(note).await.unwrap();
        assert_eq!(repo.notes_for(saved.id).await.unwrap().len(), 1);

        let orphan = CustomerNote::new(Uuid::new_v4(), Uuid::new_v4(), "x".into());
        assert!(matches!(
            repo.add_note(orphan).await.unwrap_err(),
            RepoError::NotFound
        ));
    }
}
