use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use atrium_core::domain::{Project, ProjectStatus};
use atrium_core::error::RepoError;
use atrium_core::ports::{BaseRepository, Page, ProjectRepository};

/// In-memory project repository.
pub struct InMemoryProjectRepository {
    rows: RwLock<HashMap<Uuid, Project>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryProjectRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Project, Uuid> for InMemoryProjectRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, project: Project) -> Result<Project, RepoError> {
        self.rows.write().await.insert(project.id, project.clone());
        Ok(project)
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
impl ProjectRepository for InMemoryProjectRepository {
    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<ProjectStatus>,
    ) -> Result<Page<Project>, RepoError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<Project> = rows
            .values()
            .filter(|p| status.map_or(true, |s| p.status == s))
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
}
