//! Stage gate: owns a project's position in the delivery pipeline and
//! enforces the approval gate in front of distribution.
//!
//! Reads never fail; degraded lookups surface as blocked status values.
//! The only write, [`PipelineStageGate::update_stage`], fails loud and
//! serializes its check-then-act per project so two racing transitions
//! cannot both pass the distribution gate.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::approval::ApprovalStatus;
use crate::core::context::OrgContext;
use crate::store::{ProjectStore, Store, StoreError, WorkflowStore};

use super::project::ProjectRecord;
use super::stages::PipelineStage;

#[derive(Debug, Error)]
pub enum GateError {
    /// Absence and cross-tenant access are deliberately the same error.
    #[error("Project not found or not authorized")]
    NotFound,
    #[error("Customer approval required before distribution")]
    ApprovalRequired,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type GateResult<T> = Result<T, GateError>;

/// Snapshot answer to "where is this project and can it move".
#[derive(Debug, Clone)]
pub struct PipelineStatus {
    pub current_stage: PipelineStage,
    pub approval_status: Option<ApprovalStatus>,
    pub can_progress: bool,
    pub next_stage: Option<PipelineStage>,
    pub blocked_reason: Option<String>,
}

impl PipelineStatus {
    fn blocked(current_stage: PipelineStage, reason: &str) -> Self {
        Self {
            current_stage,
            approval_status: None,
            can_progress: false,
            next_stage: None,
            blocked_reason: Some(reason.to_string()),
        }
    }
}

/// Stage-transition service over the project collection.
pub struct PipelineStageGate {
    store: Arc<Store>,
    /// Per-project transition guards, created on first use.
    transition_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PipelineStageGate {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            transition_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, project_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.transition_locks.lock().await;
        Arc::clone(
            locks
                .entry(project_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Move a project to `new_stage`, merging `transition_data` into the
    /// project document in the same write.
    ///
    /// Entering distribution requires the governing workflow (newest
    /// workflow of the first linked campaign) to be fully approved; a
    /// failed lookup during that check fails closed.
    pub async fn update_stage(
        &self,
        project_id: &str,
        new_stage: PipelineStage,
        transition_data: serde_json::Map<String, serde_json::Value>,
        ctx: &OrgContext,
    ) -> GateResult<ProjectRecord> {
        let guard = self.lock_for(project_id).await;
        let _held = guard.lock().await;

        let mut project = self
            .store
            .get_project(project_id, &ctx.organization_id)
            .await?
            .ok_or(GateError::NotFound)?;

        if new_stage == PipelineStage::Distribution {
            self.check_distribution_gate(&project, ctx).await?;
        }

        for (key, value) in transition_data {
            project.transition_data.insert(key, value);
        }
        project.current_stage = new_stage.clone();
        project.stage_updated_at = Some(Utc::now());
        project.stage_updated_by = Some(ctx.user_id.clone());
        project.updated_at = Utc::now();
        self.store.update_project(&project).await?;

        log::info!(
            "project {} moved to stage {}",
            project_id,
            new_stage
        );
        Ok(project)
    }

    async fn check_distribution_gate(
        &self,
        project: &ProjectRecord,
        ctx: &OrgContext,
    ) -> GateResult<()> {
        let campaign_id = project
            .linked_campaign_ids
            .first()
            .ok_or(GateError::ApprovalRequired)?;

        let workflows = match self
            .store
            .list_workflows_by_campaign(campaign_id, &ctx.organization_id)
            .await
        {
            Ok(workflows) => workflows,
            Err(err) => {
                log::warn!(
                    "approval lookup failed during distribution gate for project {}: {}",
                    project.id,
                    err
                );
                return Err(GateError::ApprovalRequired);
            }
        };

        match workflows.first() {
            Some(workflow) if workflow.status == ApprovalStatus::Approved => Ok(()),
            _ => Err(GateError::ApprovalRequired),
        }
    }

    /// Non-throwing status read; every degraded lookup collapses into a
    /// blocked or permissive answer.
    pub async fn get_project_pipeline_status(
        &self,
        project_id: &str,
        ctx: &OrgContext,
    ) -> PipelineStatus {
        let project = match self.store.get_project(project_id, &ctx.organization_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                return PipelineStatus::blocked(
                    PipelineStage::Unknown("unknown".to_string()),
                    "Project not found",
                );
            }
            Err(err) => {
                log::warn!("project lookup failed for {}: {}", project_id, err);
                return PipelineStatus::blocked(
                    PipelineStage::Unknown("unknown".to_string()),
                    "Project not found",
                );
            }
        };

        let current_stage = project.current_stage.clone();
        let next_stage = current_stage.next_stage();

        if current_stage != PipelineStage::Approval {
            // Approval gating only applies at the approval stage; every
            // other stage, known or not, reads as free to progress.
            return PipelineStatus {
                current_stage,
                approval_status: None,
                can_progress: true,
                next_stage,
                blocked_reason: None,
            };
        }

        let approval_status = self.governing_approval_status(&project, ctx).await;
        match approval_status {
            Some(ApprovalStatus::Approved) => PipelineStatus {
                current_stage,
                approval_status,
                can_progress: true,
                next_stage,
                blocked_reason: None,
            },
            Some(_) => PipelineStatus {
                current_stage,
                approval_status,
                can_progress: false,
                next_stage,
                blocked_reason: Some("Customer approval pending".to_string()),
            },
            None => PipelineStatus {
                current_stage,
                approval_status: None,
                can_progress: false,
                next_stage,
                blocked_reason: Some("No approval found".to_string()),
            },
        }
    }

    async fn governing_approval_status(
        &self,
        project: &ProjectRecord,
        ctx: &OrgContext,
    ) -> Option<ApprovalStatus> {
        let campaign_id = project.linked_campaign_ids.first()?;
        match self
            .store
            .list_workflows_by_campaign(campaign_id, &ctx.organization_id)
            .await
        {
            Ok(workflows) => workflows.first().map(|w| w.status.clone()),
            Err(err) => {
                log::warn!(
                    "approval lookup failed during status read for project {}: {}",
                    project.id,
                    err
                );
                None
            }
        }
    }

    /// Every workflow attached to the project, newest first. Degrades to
    /// empty on any failure.
    pub async fn get_linked_approvals(
        &self,
        project_id: &str,
        ctx: &OrgContext,
    ) -> Vec<crate::core::approval::ApprovalWorkflowRecord> {
        match self
            .store
            .list_workflows_by_project(project_id, &ctx.organization_id)
            .await
        {
            Ok(workflows) => workflows,
            Err(err) => {
                log::warn!(
                    "linked approval lookup failed for project {}: {}",
                    project_id,
                    err
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::approval::{ApprovalWorkflowRecord, WorkflowProgress, WorkflowStage};
    use crate::store::new_record_id;

    fn ctx() -> OrgContext {
        OrgContext::new("org-1", "user-1")
    }

    async fn seed_project(store: &Store, stage: PipelineStage, campaigns: &[&str]) -> String {
        let mut project = ProjectRecord::new(new_record_id(), "org-1", "Spring launch");
        project.current_stage = stage;
        project.linked_campaign_ids = campaigns.iter().map(|c| c.to_string()).collect();
        let id = project.id.clone();
        store.create_project(&project).await.unwrap();
        id
    }

    async fn seed_workflow(store: &Store, campaign_id: &str, status: ApprovalStatus) {
        let now = Utc::now();
        let workflow = ApprovalWorkflowRecord {
            id: new_record_id(),
            organization_id: "org-1".to_string(),
            campaign_id: campaign_id.to_string(),
            project_id: None,
            share_id: new_record_id(),
            status,
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
        };
        store.insert_workflow(&workflow).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_project_reads_as_blocked_not_error() {
        let gate = PipelineStageGate::new(Arc::new(Store::new()));
        let status = gate.get_project_pipeline_status("nope", &ctx()).await;
        assert!(!status.can_progress);
        assert_eq!(status.blocked_reason.as_deref(), Some("Project not found"));
    }

    #[tokio::test]
    async fn test_cross_tenant_project_is_indistinguishable_from_missing() {
        let store = Arc::new(Store::new());
        let id = seed_project(&store, PipelineStage::Creation, &[]).await;
        let gate = PipelineStageGate::new(Arc::clone(&store));

        let other = OrgContext::new("org-2", "user-9");
        let status = gate.get_project_pipeline_status(&id, &other).await;
        assert_eq!(status.blocked_reason.as_deref(), Some("Project not found"));

        let err = gate
            .update_stage(&id, PipelineStage::Review, Default::default(), &other)
            .await;
        assert!(matches!(err, Err(GateError::NotFound)));
    }

    #[tokio::test]
    async fn test_approval_stage_without_workflow_blocks() {
        let store = Arc::new(Store::new());
        let id = seed_project(&store, PipelineStage::Approval, &["camp-1"]).await;
        let gate = PipelineStageGate::new(Arc::clone(&store));

        let status = gate.get_project_pipeline_status(&id, &ctx()).await;
        assert!(!status.can_progress);
        assert_eq!(status.blocked_reason.as_deref(), Some("No approval found"));
        assert_eq!(status.next_stage, Some(PipelineStage::Distribution));
    }

    #[tokio::test]
    async fn test_approval_stage_pending_workflow_blocks() {
        let store = Arc::new(Store::new());
        let id = seed_project(&store, PipelineStage::Approval, &["camp-1"]).await;
        seed_workflow(&store, "camp-1", ApprovalStatus::Pending).await;
        let gate = PipelineStageGate::new(Arc::clone(&store));

        let status = gate.get_project_pipeline_status(&id, &ctx()).await;
        assert!(!status.can_progress);
        assert_eq!(
            status.blocked_reason.as_deref(),
            Some("Customer approval pending")
        );
        assert_eq!(status.approval_status, Some(ApprovalStatus::Pending));
    }

    #[tokio::test]
    async fn test_rejected_workflow_still_blocks_at_approval() {
        let store = Arc::new(Store::new());
        let id = seed_project(&store, PipelineStage::Approval, &["camp-1"]).await;
        seed_workflow(&store, "camp-1", ApprovalStatus::Rejected).await;
        let gate = PipelineStageGate::new(Arc::clone(&store));

        let status = gate.get_project_pipeline_status(&id, &ctx()).await;
        assert!(!status.can_progress);
        assert_eq!(
            status.blocked_reason.as_deref(),
            Some("Customer approval pending")
        );
    }

    #[tokio::test]
    async fn test_approved_workflow_opens_the_gate() {
        let store = Arc::new(Store::new());
        let id = seed_project(&store, PipelineStage::Approval, &["camp-1"]).await;
        seed_workflow(&store, "camp-1", ApprovalStatus::Approved).await;
        let gate = PipelineStageGate::new(Arc::clone(&store));

        let status = gate.get_project_pipeline_status(&id, &ctx()).await;
        assert!(status.can_progress);
        assert!(status.blocked_reason.is_none());

        let project = gate
            .update_stage(&id, PipelineStage::Distribution, Default::default(), &ctx())
            .await
            .unwrap();
        assert_eq!(project.current_stage, PipelineStage::Distribution);
        assert_eq!(project.stage_updated_by.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_distribution_without_approval_is_refused_with_no_write() {
        let store = Arc::new(Store::new());
        let id = seed_project(&store, PipelineStage::Approval, &["camp-1"]).await;
        seed_workflow(&store, "camp-1", ApprovalStatus::Pending).await;
        let gate = PipelineStageGate::new(Arc::clone(&store));

        let err = gate
            .update_stage(&id, PipelineStage::Distribution, Default::default(), &ctx())
            .await;
        assert!(matches!(err, Err(GateError::ApprovalRequired)));

        let project = store.get_project(&id, "org-1").await.unwrap().unwrap();
        assert_eq!(project.current_stage, PipelineStage::Approval);
        assert!(project.stage_updated_at.is_none());
    }

    #[tokio::test]
    async fn test_unknown_stage_reads_as_non_blocking_leaf() {
        let store = Arc::new(Store::new());
        let id = seed_project(
            &store,
            PipelineStage::Unknown("beta_rollout".to_string()),
            &[],
        )
        .await;
        let gate = PipelineStageGate::new(Arc::clone(&store));

        let status = gate.get_project_pipeline_status(&id, &ctx()).await;
        assert!(status.can_progress);
        assert_eq!(status.next_stage, None);
        assert!(status.blocked_reason.is_none());
    }

    #[tokio::test]
    async fn test_transition_data_is_merged_in_the_same_write() {
        let store = Arc::new(Store::new());
        let id = seed_project(&store, PipelineStage::Creation, &[]).await;
        let gate = PipelineStageGate::new(Arc::clone(&store));

        let mut data = serde_json::Map::new();
        data.insert(
            "stage_notes".to_string(),
            serde_json::Value::String("draft signed off".to_string()),
        );
        let project = gate
            .update_stage(&id, PipelineStage::Review, data, &ctx())
            .await
            .unwrap();
        assert_eq!(
            project.transition_data.get("stage_notes"),
            Some(&serde_json::Value::String("draft signed off".to_string()))
        );
    }

    #[tokio::test]
    async fn test_concurrent_transitions_serialize_per_project() {
        let store = Arc::new(Store::new());
        let id = seed_project(&store, PipelineStage::Creation, &[]).await;
        let gate = Arc::new(PipelineStageGate::new(Arc::clone(&store)));

        let a = {
            let gate = Arc::clone(&gate);
            let id = id.clone();
            tokio::spawn(async move {
                gate.update_stage(&id, PipelineStage::Review, Default::default(), &ctx())
                    .await
            })
        };
        let b = {
            let gate = Arc::clone(&gate);
            let id = id.clone();
            tokio::spawn(async move {
                gate.update_stage(&id, PipelineStage::Approval, Default::default(), &ctx())
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let project = store.get_project(&id, "org-1").await.unwrap().unwrap();
        // Both writes applied; the surviving stage is whichever ran last,
        // never a torn mix.
        assert!(matches!(
            project.current_stage,
            PipelineStage::Review | PipelineStage::Approval
        ));
        assert!(project.stage_updated_at.is_some());
    }
}
