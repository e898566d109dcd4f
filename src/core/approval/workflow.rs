//! Sign-off workflow service: creation, recipient decisions, stage
//! progression and terminal outcomes.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::core::context::OrgContext;
use crate::core::documents::DocumentVersionStatus;
use crate::core::notify::{Notification, NotificationSender};
use crate::store::{new_record_id, new_share_id, Store, StoreError, WorkflowStore};

use super::types::{
    ApprovalConfig, ApprovalStatus, ApprovalWorkflowRecord, Recipient, RecipientDecision,
    RecipientType, ShareableLinks, StartedWorkflow, WorkflowEvent, WorkflowEventKind,
    WorkflowProgress, WorkflowStage,
};

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("workflow {0} not found")]
    WorkflowNotFound(String),
    #[error("no workflow matches share id {0}")]
    ShareIdNotFound(String),
    #[error("recipient {0} is not part of this workflow")]
    RecipientNotFound(String),
    #[error("recipient {0} has already recorded a decision")]
    DecisionAlreadyRecorded(String),
    #[error("approval configuration declares no stages")]
    NoStagesDeclared,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type ApprovalResult<T> = Result<T, ApprovalError>;

/// Multi-stage sign-off service.
///
/// Notifications are fire-and-forget: a failed delivery is logged and
/// never fails the surrounding operation.
pub struct ApprovalWorkflowService<N: NotificationSender> {
    store: Arc<Store>,
    notifier: Arc<N>,
    link_base_url: String,
}

impl<N: NotificationSender> ApprovalWorkflowService<N> {
    pub fn new(store: Arc<Store>, notifier: Arc<N>, link_base_url: impl Into<String>) -> Self {
        Self {
            store,
            notifier,
            link_base_url: link_base_url.into(),
        }
    }

    /// Per-audience links for a share token, present only for declared
    /// stages.
    pub fn shareable_links(&self, share_id: &str, stages: &[WorkflowStage]) -> ShareableLinks {
        ShareableLinks {
            team: stages
                .contains(&WorkflowStage::Team)
                .then(|| format!("{}/approvals/internal/{}", self.link_base_url, share_id)),
            customer: stages
                .contains(&WorkflowStage::Customer)
                .then(|| format!("{}/approvals/{}", self.link_base_url, share_id)),
        }
    }

    /// Create a workflow from an approval configuration and notify the
    /// first declared stage's recipients.
    pub async fn start_workflow(
        &self,
        campaign_id: &str,
        project_id: Option<&str>,
        config: &ApprovalConfig,
        ctx: &OrgContext,
    ) -> ApprovalResult<StartedWorkflow> {
        let stages = config.stages();
        let first_stage = *stages.first().ok_or(ApprovalError::NoStagesDeclared)?;

        let share_id = config
            .share_id
            .clone()
            .unwrap_or_else(new_share_id);
        let links = self.shareable_links(&share_id, &stages);

        let mut recipients = Vec::new();
        if config.team_approval_required {
            for (order, approver) in config.team_approvers.iter().enumerate() {
                recipients.push(Recipient {
                    id: new_record_id(),
                    kind: RecipientType::Internal,
                    email: approver.email.clone(),
                    name: approver.display_name.clone(),
                    stage: WorkflowStage::Team,
                    status: RecipientDecision::Pending,
                    decision: None,
                    decided_at: None,
                    comment: None,
                    notifications_sent: 0,
                    order: order as u32,
                });
            }
        }
        if config.customer_approval_required {
            if let Some(contact) = &config.customer_contact {
                recipients.push(Recipient {
                    id: new_record_id(),
                    kind: RecipientType::Customer,
                    email: contact.email.clone(),
                    name: contact.name.clone(),
                    stage: WorkflowStage::Customer,
                    status: RecipientDecision::Pending,
                    decision: None,
                    decided_at: None,
                    comment: None,
                    notifications_sent: 0,
                    order: 0,
                });
            }
        }

        let now = Utc::now();
        let mut workflow = ApprovalWorkflowRecord {
            id: new_record_id(),
            organization_id: ctx.organization_id.clone(),
            campaign_id: campaign_id.to_string(),
            project_id: project_id.map(str::to_string),
            share_id: share_id.clone(),
            status: ApprovalStatus::Pending,
            workflow: WorkflowProgress {
                is_multi_stage: stages.len() > 1,
                current_stage: first_stage,
                stages,
            },
            recipients,
            history: vec![WorkflowEvent::now(
                WorkflowEventKind::Created,
                Some(ctx.user_id.clone()),
                format!("workflow created for campaign {}", campaign_id),
            )],
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        // Persist before notifying so no recipient ever holds a link to
        // a workflow that failed to insert; the notification counts are
        // stamped with a follow-up write.
        self.store.insert_workflow(&workflow).await?;
        self.notify_stage(&mut workflow, first_stage, config).await;
        workflow.updated_at = Utc::now();
        self.store.update_workflow(&workflow).await?;

        log::info!(
            "started workflow {} for campaign {} ({} stage(s))",
            workflow.id,
            campaign_id,
            workflow.workflow.stages.len()
        );
        Ok(StartedWorkflow {
            workflow_id: workflow.id,
            share_id,
            shareable_links: links,
        })
    }

    async fn notify_stage(
        &self,
        workflow: &mut ApprovalWorkflowRecord,
        stage: WorkflowStage,
        config: &ApprovalConfig,
    ) {
        let links = self.shareable_links(&workflow.share_id, &workflow.workflow.stages);
        let message = match stage {
            WorkflowStage::Team => config.team_approval_message.clone(),
            WorkflowStage::Customer => config.customer_approval_message.clone(),
            WorkflowStage::Final => None,
        };
        let workflow_id = workflow.id.clone();
        for recipient in workflow.recipients.iter_mut().filter(|r| r.stage == stage) {
            let link = match recipient.kind {
                RecipientType::Internal => links.team.clone(),
                RecipientType::Customer => links.customer.clone(),
            };
            let Some(link) = link else { continue };
            let note = Notification::ApprovalRequested {
                workflow_id: workflow_id.clone(),
                recipient_email: recipient.email.clone(),
                recipient_name: recipient.name.clone(),
                stage,
                link,
                message: message.clone(),
            };
            if let Err(err) = self.notifier.send(&note).await {
                log::warn!(
                    "notification to {} for workflow {} failed: {}",
                    recipient.email,
                    workflow_id,
                    err
                );
            }
            recipient.notifications_sent += 1;
        }
    }

    /// Record one recipient's decision through the shareable link.
    ///
    /// Decisions are immutable once set; a rejection makes the whole
    /// workflow terminal on the spot.
    pub async fn record_decision(
        &self,
        share_id: &str,
        recipient_email: &str,
        decision: RecipientDecision,
        comment: Option<String>,
    ) -> ApprovalResult<ApprovalWorkflowRecord> {
        let mut workflow = self
            .store
            .find_workflow_by_share_id(share_id)
            .await?
            .ok_or_else(|| ApprovalError::ShareIdNotFound(share_id.to_string()))?;

        let recipient = workflow
            .recipients
            .iter_mut()
            .find(|r| r.email == recipient_email)
            .ok_or_else(|| ApprovalError::RecipientNotFound(recipient_email.to_string()))?;
        if recipient.decision.is_some() {
            return Err(ApprovalError::DecisionAlreadyRecorded(
                recipient_email.to_string(),
            ));
        }

        recipient.decision = Some(decision);
        recipient.status = decision;
        recipient.decided_at = Some(Utc::now());
        recipient.comment = comment;

        workflow.history.push(WorkflowEvent::now(
            WorkflowEventKind::DecisionRecorded,
            Some(recipient_email.to_string()),
            format!("decision recorded: {:?}", decision),
        ));

        if decision == RecipientDecision::Rejected {
            workflow.status = ApprovalStatus::Rejected;
            workflow.completed_at = Some(Utc::now());
            workflow.history.push(WorkflowEvent::now(
                WorkflowEventKind::Completed,
                Some(recipient_email.to_string()),
                "workflow rejected".to_string(),
            ));
        }

        workflow.updated_at = Utc::now();
        self.store.update_workflow(&workflow).await?;
        Ok(workflow)
    }

    /// Resolve one stage: if every recipient in it approved, advance to
    /// the next declared stage (or leave the workflow pending at the
    /// last stage, awaiting [`Self::complete_workflow`]). Any rejection
    /// in the stage makes the workflow rejected.
    pub async fn process_stage_completion(
        &self,
        workflow_id: &str,
        stage: WorkflowStage,
    ) -> ApprovalResult<ApprovalWorkflowRecord> {
        let mut workflow = self
            .store
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| ApprovalError::WorkflowNotFound(workflow_id.to_string()))?;

        if workflow.status.is_terminal() {
            // Terminal workflows never move again.
            return Ok(workflow);
        }

        // Resolve each recipient to its individually recorded decision.
        for recipient in workflow.recipients.iter_mut().filter(|r| r.stage == stage) {
            if let Some(decision) = recipient.decision {
                recipient.status = decision;
            }
        }

        let any_rejected = workflow
            .recipients_in_stage(stage)
            .any(|r| r.status == RecipientDecision::Rejected);
        if any_rejected {
            workflow.status = ApprovalStatus::Rejected;
            workflow.completed_at = Some(Utc::now());
            workflow.history.push(WorkflowEvent::now(
                WorkflowEventKind::Completed,
                None,
                format!("workflow rejected at stage {}", stage),
            ));
            workflow.updated_at = Utc::now();
            self.store.update_workflow(&workflow).await?;
            return Ok(workflow);
        }

        let all_approved = workflow
            .recipients_in_stage(stage)
            .all(|r| r.status == RecipientDecision::Approved);
        if all_approved {
            if let Some(next) = workflow.workflow.stage_after(stage) {
                workflow.workflow.current_stage = next;
                workflow.history.push(WorkflowEvent::now(
                    WorkflowEventKind::StageAdvanced,
                    None,
                    format!("advanced from {} to {}", stage, next),
                ));
                self.notify_stage(&mut workflow, next, &ApprovalConfig::default())
                    .await;
            } else {
                workflow.history.push(WorkflowEvent::now(
                    WorkflowEventKind::StageAdvanced,
                    None,
                    format!("final stage {} fully approved", stage),
                ));
            }
        }

        workflow.updated_at = Utc::now();
        self.store.update_workflow(&workflow).await?;
        Ok(workflow)
    }

    /// Set the terminal outcome. Completing an already-terminal workflow
    /// is a no-op.
    pub async fn complete_workflow(
        &self,
        workflow_id: &str,
        approved: bool,
    ) -> ApprovalResult<ApprovalWorkflowRecord> {
        let mut workflow = self
            .store
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| ApprovalError::WorkflowNotFound(workflow_id.to_string()))?;

        if workflow.status.is_terminal() {
            return Ok(workflow);
        }

        workflow.status = if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        };
        workflow.completed_at = Some(Utc::now());
        workflow.history.push(WorkflowEvent::now(
            WorkflowEventKind::Completed,
            None,
            format!("workflow completed: {}", workflow.status),
        ));
        workflow.updated_at = Utc::now();
        self.store.update_workflow(&workflow).await?;

        if approved {
            for recipient in &workflow.recipients {
                let note = Notification::WorkflowCompleted {
                    workflow_id: workflow.id.clone(),
                    recipient_email: recipient.email.clone(),
                    approved,
                };
                if let Err(err) = self.notifier.send(&note).await {
                    log::warn!(
                        "completion notification to {} failed: {}",
                        recipient.email,
                        err
                    );
                }
            }
        }
        Ok(workflow)
    }

    /// React to an externally observed document-status change for a
    /// campaign. Absorbs every failure: a document operation must never
    /// block on this callback.
    pub async fn handle_pdf_status_update(
        &self,
        campaign_id: &str,
        status: &DocumentVersionStatus,
        ctx: &OrgContext,
    ) {
        let workflows = match self
            .store
            .list_workflows_by_campaign(campaign_id, &ctx.organization_id)
            .await
        {
            Ok(workflows) => workflows,
            Err(err) => {
                log::warn!(
                    "workflow lookup failed while handling document status for {}: {}",
                    campaign_id,
                    err
                );
                return;
            }
        };
        let Some(active) = workflows.iter().find(|w| !w.status.is_terminal()) else {
            log::debug!("no active workflow for campaign {}", campaign_id);
            return;
        };

        let result = match status {
            DocumentVersionStatus::Approved => {
                let stage = active.workflow.current_stage;
                self.process_stage_completion(&active.id, stage).await
            }
            DocumentVersionStatus::Rejected => self.complete_workflow(&active.id, false).await,
            other => {
                self.sync_workflow_with_pdf_status(
                    &active.id,
                    other,
                    "document status observed",
                )
                .await
            }
        };
        if let Err(err) = result {
            log::warn!(
                "workflow update from document status failed for campaign {}: {}",
                campaign_id,
                err
            );
        }
    }

    /// Fold an observed document status into workflow history without
    /// re-deriving recipient decisions.
    pub async fn sync_workflow_with_pdf_status(
        &self,
        workflow_id: &str,
        status: &DocumentVersionStatus,
        note: &str,
    ) -> ApprovalResult<ApprovalWorkflowRecord> {
        let mut workflow = self
            .store
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| ApprovalError::WorkflowNotFound(workflow_id.to_string()))?;

        workflow.history.push(WorkflowEvent::now(
            WorkflowEventKind::DocumentStatusObserved,
            None,
            format!("{}: {}", note, status),
        ));
        workflow.updated_at = Utc::now();
        self.store.update_workflow(&workflow).await?;
        Ok(workflow)
    }

    pub async fn get_workflow(
        &self,
        workflow_id: &str,
    ) -> ApprovalResult<ApprovalWorkflowRecord> {
        self.store
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| ApprovalError::WorkflowNotFound(workflow_id.to_string()))
    }

    pub async fn get_workflow_by_share_id(
        &self,
        share_id: &str,
    ) -> ApprovalResult<ApprovalWorkflowRecord> {
        self.store
            .find_workflow_by_share_id(share_id)
            .await?
            .ok_or_else(|| ApprovalError::ShareIdNotFound(share_id.to_string()))
    }

    pub async fn get_workflows_by_organization(
        &self,
        ctx: &OrgContext,
    ) -> ApprovalResult<Vec<ApprovalWorkflowRecord>> {
        Ok(self
            .store
            .list_workflows_by_organization(&ctx.organization_id)
            .await?)
    }
}
