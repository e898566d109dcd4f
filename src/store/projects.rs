//! Project collection operations.

use super::error::{StoreError, StoreResult};
use super::Store;
use crate::core::pipeline::ProjectRecord;

/// Extension trait for project document operations.
pub trait ProjectStore {
    fn create_project(
        &self,
        project: &ProjectRecord,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;

    /// Tenant-scoped read: `None` when absent or owned by another
    /// organization.
    fn get_project(
        &self,
        id: &str,
        organization_id: &str,
    ) -> impl std::future::Future<Output = StoreResult<Option<ProjectRecord>>> + Send;

    /// Single-document replace; fails if the project does not exist.
    fn update_project(
        &self,
        project: &ProjectRecord,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;
}

impl ProjectStore for Store {
    async fn create_project(&self, project: &ProjectRecord) -> StoreResult<()> {
        let mut projects = self.projects.write().await;
        if projects.contains_key(&project.id) {
            return Err(StoreError::conflict(format!(
                "projects/{} already exists",
                project.id
            )));
        }
        projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn get_project(
        &self,
        id: &str,
        organization_id: &str,
    ) -> StoreResult<Option<ProjectRecord>> {
        let projects = self.projects.read().await;
        Ok(projects
            .get(id)
            .filter(|p| p.organization_id == organization_id)
            .cloned())
    }

    async fn update_project(&self, project: &ProjectRecord) -> StoreResult<()> {
        let mut projects = self.projects.write().await;
        if !projects.contains_key(&project.id) {
            return Err(StoreError::not_found(format!("projects/{}", project.id)));
        }
        projects.insert(project.id.clone(), project.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::PipelineStage;

    fn sample(id: &str, org: &str) -> ProjectRecord {
        ProjectRecord::new(id, org, "Spring launch")
    }

    #[tokio::test]
    async fn test_scoped_project_lookup() {
        let store = Store::new();
        store.create_project(&sample("proj-1", "org-1")).await.unwrap();

        let found = store.get_project("proj-1", "org-1").await.unwrap();
        assert_eq!(
            found.map(|p| p.current_stage),
            Some(PipelineStage::IdeasPlanning)
        );
        assert!(store.get_project("proj-1", "org-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_requires_existing_project() {
        let store = Store::new();
        let err = store.update_project(&sample("proj-1", "org-1")).await;
        assert!(matches!(err, Err(StoreError::NotFound(_))));
    }
}
