//! Approval-workflow collection operations.

use super::error::{StoreError, StoreResult};
use super::Store;
use crate::core::approval::ApprovalWorkflowRecord;

/// Extension trait for workflow document operations.
pub trait WorkflowStore {
    fn insert_workflow(
        &self,
        workflow: &ApprovalWorkflowRecord,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;

    fn get_workflow(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = StoreResult<Option<ApprovalWorkflowRecord>>> + Send;

    /// Single-document replace; fails if the workflow does not exist.
    fn update_workflow(
        &self,
        workflow: &ApprovalWorkflowRecord,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;

    /// Resolve a share token to its workflow, for link-based access.
    fn find_workflow_by_share_id(
        &self,
        share_id: &str,
    ) -> impl std::future::Future<Output = StoreResult<Option<ApprovalWorkflowRecord>>> + Send;

    /// Workflows for one campaign within one organization, newest first.
    fn list_workflows_by_campaign(
        &self,
        campaign_id: &str,
        organization_id: &str,
    ) -> impl std::future::Future<Output = StoreResult<Vec<ApprovalWorkflowRecord>>> + Send;

    /// Workflows attached to one project within one organization,
    /// newest first.
    fn list_workflows_by_project(
        &self,
        project_id: &str,
        organization_id: &str,
    ) -> impl std::future::Future<Output = StoreResult<Vec<ApprovalWorkflowRecord>>> + Send;

    /// Every workflow in one organization, newest first.
    fn list_workflows_by_organization(
        &self,
        organization_id: &str,
    ) -> impl std::future::Future<Output = StoreResult<Vec<ApprovalWorkflowRecord>>> + Send;
}

fn newest_first(workflows: &mut [ApprovalWorkflowRecord]) {
    workflows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl WorkflowStore for Store {
    async fn insert_workflow(&self, workflow: &ApprovalWorkflowRecord) -> StoreResult<()> {
        let mut workflows = self.workflows.write().await;
        if workflows.contains_key(&workflow.id) {
            return Err(StoreError::conflict(format!(
                "workflows/{} already exists",
                workflow.id
            )));
        }
        workflows.insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn get_workflow(&self, id: &str) -> StoreResult<Option<ApprovalWorkflowRecord>> {
        let workflows = self.workflows.read().await;
        Ok(workflows.get(id).cloned())
    }

    async fn update_workflow(&self, workflow: &ApprovalWorkflowRecord) -> StoreResult<()> {
        let mut workflows = self.workflows.write().await;
        if !workflows.contains_key(&workflow.id) {
            return Err(StoreError::not_found(format!("workflows/{}", workflow.id)));
        }
        workflows.insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn find_workflow_by_share_id(
        &self,
        share_id: &str,
    ) -> StoreResult<Option<ApprovalWorkflowRecord>> {
        let workflows = self.workflows.read().await;
        Ok(workflows.values().find(|w| w.share_id == share_id).cloned())
    }

    async fn list_workflows_by_campaign(
        &self,
        campaign_id: &str,
        organization_id: &str,
    ) -> StoreResult<Vec<ApprovalWorkflowRecord>> {
        let workflows = self.workflows.read().await;
        let mut matched: Vec<_> = workflows
            .values()
            .filter(|w| w.campaign_id == campaign_id && w.organization_id == organization_id)
            .cloned()
            .collect();
        newest_first(&mut matched);
        Ok(matched)
    }

    async fn list_workflows_by_project(
        &self,
        project_id: &str,
        organization_id: &str,
    ) -> StoreResult<Vec<ApprovalWorkflowRecord>> {
        let workflows = self.workflows.read().await;
        let mut matched: Vec<_> = workflows
            .values()
            .filter(|w| {
                w.project_id.as_deref() == Some(project_id)
                    && w.organization_id == organization_id
            })
            .cloned()
            .collect();
        newest_first(&mut matched);
        Ok(matched)
    }

    async fn list_workflows_by_organization(
        &self,
        organization_id: &str,
    ) -> StoreResult<Vec<ApprovalWorkflowRecord>> {
        let workflows = self.workflows.read().await;
        let mut matched: Vec<_> = workflows
            .values()
            .filter(|w| w.organization_id == organization_id)
            .cloned()
            .collect();
        newest_first(&mut matched);
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::approval::{ApprovalStatus, WorkflowProgress, WorkflowStage};
    use chrono::{Duration, Utc};

    fn sample(id: &str, campaign: &str, org: &str, share: &str) -> ApprovalWorkflowRecord {
        let now = Utc::now();
        ApprovalWorkflowRecord {
            id: id.to_string(),
            organization_id: org.to_string(),
            campaign_id: campaign.to_string(),
            project_id: None,
            share_id: share.to_string(),
            status: ApprovalStatus::Pending,
            workflow: WorkflowProgress {
                stages: vec![WorkflowStage::Customer],
                current_stage: WorkflowStage::Customer,
                is_multi_stage: false,
            },
            recipients: Vec::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_share_id_lookup() {
        let store = Store::new();
        store
            .insert_workflow(&sample("wf-1", "camp-1", "org-1", "abc123"))
            .await
            .unwrap();

        let found = store.find_workflow_by_share_id("abc123").await.unwrap();
        assert_eq!(found.map(|w| w.id), Some("wf-1".to_string()));
        assert!(store.find_workflow_by_share_id("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_campaign_listing_is_newest_first_and_scoped() {
        let store = Store::new();
        let mut older = sample("wf-1", "camp-1", "org-1", "s1");
        older.created_at = Utc::now() - Duration::minutes(5);
        store.insert_workflow(&older).await.unwrap();
        store
            .insert_workflow(&sample("wf-2", "camp-1", "org-1", "s2"))
            .await
            .unwrap();
        store
            .insert_workflow(&sample("wf-3", "camp-1", "org-2", "s3"))
            .await
            .unwrap();

        let listed = store
            .list_workflows_by_campaign("camp-1", "org-1")
            .await
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["wf-2", "wf-1"]);

        let org_wide = store.list_workflows_by_organization("org-2").await.unwrap();
        assert_eq!(org_wide.len(), 1);
    }

    #[tokio::test]
    async fn test_project_listing_requires_back_reference() {
        let store = Store::new();
        let mut linked = sample("wf-1", "camp-1", "org-1", "s1");
        linked.project_id = Some("proj-1".to_string());
        store.insert_workflow(&linked).await.unwrap();
        store
            .insert_workflow(&sample("wf-2", "camp-1", "org-1", "s2"))
            .await
            .unwrap();

        let listed = store
            .list_workflows_by_project("proj-1", "org-1")
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "wf-1");
    }
}
