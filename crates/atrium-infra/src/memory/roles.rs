use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use atrium_core::domain::Role;
use atrium_core::error::RepoError;
use atrium_core::ports::{BaseRepository, RoleRepository};

/// In-memory role repository.
pub struct InMemoryRoleRepository {
    rows: RwLock<HashMap<Uuid, Role>>,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the standard roles a fresh deployment starts with.
    pub async fn with_defaults() -> Self {
        let repo = Self::new();
        {
            let mut rows = repo.rows.write().await;
            for role in [
                Role::new("admin".into(), vec!["*".into()]),
                Role::new(
                    "staff".into(),
                    vec![
                        "customers:read".into(),
                        "customers:write".into(),
                        "appointments:read".into(),
                        "appointments:write".into(),
                        "requests:read".into(),
                        "requests:write".into(),
                        "projects:read".into(),
                        "projects:write".into(),
                    ],
                ),
            ] {
                rows.insert(role.id, role);
            }
        }
        repo
    }
}

impl Default for InMemoryRoleRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Role, Uuid> for InMemoryRoleRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, role: Role) -> Result<Role, RepoError> {
        let mut rows = self.rows.write().await;
        if rows.values().any(|r| r.name == role.name && r.id != role.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(role.id, role.clone());
        Ok(role)
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
impl RoleRepository for InMemoryRoleRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Role>, RepoError> {
        let rows = self.rows.read().await;
        let mut roles: Vec<Role> = rows.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_include_admin_with_wildcard() {
        let repo = InMemoryRoleRepository::with_defaults().await;
        let admin = repo.find_by_name("admin").await.unwrap().unwrap();
        assert!(admin.allows("users:write"));

        let staff = repo.find_by_name("staff").await.unwrap().unwrap();
        assert!(staff.allows("customers:read"));
        assert!(!staff.allows("users:write"));
    }
}
