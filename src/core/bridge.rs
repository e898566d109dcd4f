//! Orchestration over campaign, workflow and document creation.
//!
//! The bridge runs the three-step save saga: persist the campaign, start
//! its approval workflow, render and record the first document version.
//! A render failure fails the whole save; the already-created workflow is
//! never referenced by a document and a retry starts fresh rather than
//! repairing the failed attempt.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::core::approval::{
    ApprovalConfig, ApprovalError, ApprovalStatus, ApprovalWorkflowService, ShareableLinks,
};
use crate::core::campaign::CampaignRecord;
use crate::core::context::OrgContext;
use crate::core::documents::{
    DocumentVersionLedger, DocumentVersionStatus, LedgerError, VersionOptions,
};
use crate::core::notify::NotificationSender;
use crate::core::render::DocumentRenderer;
use crate::store::{CampaignStore, Store, StoreError};

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Absence and cross-tenant access are deliberately the same error.
    #[error("Campaign not found or not authorized")]
    CampaignNotFound,
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Outcome of an integrated campaign save. The workflow and version
/// fields are absent when the campaign requires no approval.
#[derive(Debug, Clone)]
pub struct CampaignApprovalResult {
    pub campaign_id: String,
    pub workflow_id: Option<String>,
    pub pdf_version_id: Option<String>,
    pub shareable_links: Option<ShareableLinks>,
}

/// Saga-style orchestrator over the approval and document services.
pub struct ApprovalPipelineBridge<R: DocumentRenderer, N: NotificationSender> {
    store: Arc<Store>,
    approvals: ApprovalWorkflowService<N>,
    documents: DocumentVersionLedger<R, N>,
}

impl<R: DocumentRenderer, N: NotificationSender> ApprovalPipelineBridge<R, N> {
    pub fn new(
        store: Arc<Store>,
        renderer: Arc<R>,
        notifier: Arc<N>,
        config: &AppConfig,
    ) -> Self {
        let approvals = ApprovalWorkflowService::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
            config.links.base_url.clone(),
        );
        let documents = DocumentVersionLedger::new(
            Arc::clone(&store),
            renderer,
            notifier,
            config.documents.clone(),
        );
        Self {
            store,
            approvals,
            documents,
        }
    }

    pub fn approvals(&self) -> &ApprovalWorkflowService<N> {
        &self.approvals
    }

    pub fn documents(&self) -> &DocumentVersionLedger<R, N> {
        &self.documents
    }

    /// Persist a campaign and, when its configuration asks for sign-off,
    /// start a workflow and record the first document version for it.
    ///
    /// On re-save only the caller-editable fields are taken from the
    /// input; the lock fields, unlock requests and version pointer are
    /// derived state owned by the ledger and carried forward unchanged.
    pub async fn save_campaign_with_approval_integration(
        &self,
        campaign: CampaignRecord,
        approval_config: &ApprovalConfig,
        ctx: &OrgContext,
    ) -> BridgeResult<CampaignApprovalResult> {
        match self
            .store
            .get_campaign(&campaign.id, &ctx.organization_id)
            .await?
        {
            Some(mut stored) => {
                stored.content = campaign.content.clone();
                stored.status = campaign.status.clone();
                stored.project_id = campaign.project_id.clone();
                stored.updated_at = Utc::now();
                self.store.update_campaign(&stored).await?;
            }
            None => match self.store.create_campaign(&campaign).await {
                Ok(()) => {}
                // The id exists but is invisible to this tenant; report
                // it exactly like absence.
                Err(StoreError::Conflict(_)) => return Err(BridgeError::CampaignNotFound),
                Err(other) => return Err(other.into()),
            },
        }

        if !approval_config.requires_approval() {
            log::debug!(
                "campaign {} saved without approval integration",
                campaign.id
            );
            return Ok(CampaignApprovalResult {
                campaign_id: campaign.id,
                workflow_id: None,
                pdf_version_id: None,
                shareable_links: None,
            });
        }

        let started = self
            .approvals
            .start_workflow(
                &campaign.id,
                campaign.project_id.as_deref(),
                approval_config,
                ctx,
            )
            .await?;

        // Render failure propagates here; the workflow above stays
        // unused and a retry creates a fresh one.
        let version_id = self
            .documents
            .create_version(
                &campaign.id,
                &campaign.content,
                VersionOptions {
                    created_by: ctx.user_id.clone(),
                    status: DocumentVersionStatus::PendingCustomer,
                    approval_id: Some(started.workflow_id.clone()),
                },
                ctx,
            )
            .await?;

        log::info!(
            "campaign {} saved with workflow {} and version {}",
            campaign.id,
            started.workflow_id,
            version_id
        );
        Ok(CampaignApprovalResult {
            campaign_id: campaign.id,
            workflow_id: Some(started.workflow_id),
            pdf_version_id: Some(version_id),
            shareable_links: Some(started.shareable_links),
        })
    }

    /// Push a workflow's current outcome onto the campaign's newest
    /// document version. A campaign without a current version is
    /// tolerated with a warning.
    pub async fn propagate_workflow_outcome(
        &self,
        workflow_id: &str,
        ctx: &OrgContext,
    ) -> BridgeResult<()> {
        let workflow = self.approvals.get_workflow(workflow_id).await?;
        let document_status = match workflow.status {
            ApprovalStatus::Approved => DocumentVersionStatus::Approved,
            ApprovalStatus::Rejected => DocumentVersionStatus::Rejected,
            ApprovalStatus::Pending | ApprovalStatus::Draft => {
                DocumentVersionStatus::PendingCustomer
            }
            ApprovalStatus::Unknown(ref other) => {
                log::warn!(
                    "workflow {} has unrecognized status {}; nothing to propagate",
                    workflow_id,
                    other
                );
                return Ok(());
            }
        };

        let Some(version) = self
            .documents
            .get_current_version(&workflow.campaign_id, ctx)
            .await?
        else {
            log::warn!(
                "campaign {} has no document version to receive workflow outcome",
                workflow.campaign_id
            );
            return Ok(());
        };

        self.documents
            .update_version_status(&version.id, document_status, Some(workflow_id))
            .await?;
        Ok(())
    }
}
