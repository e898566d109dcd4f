//! Version ledger: immutable numbered document renderings per campaign
//! and the campaign edit lock derived from them.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;

use crate::config::DocumentConfig;
use crate::core::campaign::{
    CampaignContent, CampaignRecord, Requester, UnlockRequest, UnlockRequestStatus,
};
use crate::core::context::OrgContext;
use crate::core::notify::{Notification, NotificationSender};
use crate::core::render::{DocumentRenderer, RenderError, RenderRequest};
use crate::store::{
    new_record_id, CampaignStore, Store, StoreError, VersionStore, WorkflowStore,
};

use super::types::{
    lock_directive_for, ContentSnapshot, CustomerApproval, DocumentVersionRecord,
    DocumentVersionStatus, EditLockReason, LockDirective, VersionMetadata,
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("document version {0} not found")]
    VersionNotFound(String),
    #[error("campaign {0} not found or not authorized")]
    CampaignNotFound(String),
    #[error("campaign {0} is not locked")]
    CampaignNotLocked(String),
    #[error("campaign {0} already has a pending unlock request")]
    PendingUnlockRequest(String),
    #[error("unlock request {0} not found")]
    UnlockRequestNotFound(String),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Caller-supplied parameters for a new version.
#[derive(Debug, Clone)]
pub struct VersionOptions {
    pub created_by: String,
    pub status: DocumentVersionStatus,
    pub approval_id: Option<String>,
}

/// Answer to "may this campaign be edited right now".
#[derive(Debug, Clone)]
pub struct EditLockStatus {
    pub is_locked: bool,
    pub reason: Option<EditLockReason>,
    pub locked_at: Option<chrono::DateTime<Utc>>,
    pub can_request_unlock: bool,
}

/// Document-version service over the version and campaign collections.
pub struct DocumentVersionLedger<R: DocumentRenderer, N: NotificationSender> {
    store: Arc<Store>,
    renderer: Arc<R>,
    notifier: Arc<N>,
    config: DocumentConfig,
}

impl<R: DocumentRenderer, N: NotificationSender> DocumentVersionLedger<R, N> {
    pub fn new(
        store: Arc<Store>,
        renderer: Arc<R>,
        notifier: Arc<N>,
        config: DocumentConfig,
    ) -> Self {
        Self {
            store,
            renderer,
            notifier,
            config,
        }
    }

    /// Render the campaign content and record it as the campaign's next
    /// version. Returns the new version id.
    ///
    /// The render runs before any write, so a failed render consumes no
    /// version number. A failed approval lookup never blocks creation;
    /// the version is stored without approval metadata.
    pub async fn create_version(
        &self,
        campaign_id: &str,
        content: &CampaignContent,
        options: VersionOptions,
        ctx: &OrgContext,
    ) -> LedgerResult<String> {
        let created_for_approval = options.status == DocumentVersionStatus::PendingCustomer;
        let snapshot = ContentSnapshot {
            title: content.title.clone(),
            main_content: content.main_content.clone(),
            boilerplate_sections: content.boilerplate_sections.clone(),
            key_visual: content.key_visual.clone(),
            created_for_approval,
        };

        let started = Instant::now();
        let rendered = self
            .renderer
            .render(&RenderRequest {
                campaign_id: campaign_id.to_string(),
                organization_id: ctx.organization_id.clone(),
                snapshot: snapshot.clone(),
            })
            .await?;
        let generation_time_ms = started.elapsed().as_millis() as u64;

        let customer_approval = if created_for_approval {
            self.lookup_customer_approval(options.approval_id.as_deref())
                .await
        } else {
            None
        };

        let word_count = count_words(&snapshot.main_content);
        let now = Utc::now();
        let mut version = DocumentVersionRecord {
            id: new_record_id(),
            campaign_id: campaign_id.to_string(),
            organization_id: ctx.organization_id.clone(),
            version: 0,
            status: options.status.clone(),
            approval_id: options.approval_id.clone(),
            customer_approval,
            download_url: rendered.download_url,
            file_name: String::new(),
            file_size: rendered.file_size_bytes,
            content_snapshot: snapshot,
            metadata: VersionMetadata {
                word_count,
                page_count: estimate_pages(word_count),
                generation_time_ms,
            },
            created_by: options.created_by,
            created_at: now,
            updated_at: now,
            linked_at: None,
        };

        let number = self.store.insert_version(&version).await?;
        version.version = number;
        version.file_name = format_file_name(&content.title, number, &now);
        self.store.update_version(&version).await?;

        log::info!(
            "created version {} (v{}) for campaign {}",
            version.id,
            number,
            campaign_id
        );

        self.update_campaign_after_create(campaign_id, &version.id, created_for_approval)
            .await?;
        Ok(version.id)
    }

    async fn lookup_customer_approval(
        &self,
        approval_id: Option<&str>,
    ) -> Option<CustomerApproval> {
        let approval_id = approval_id?;
        match self.store.get_workflow(approval_id).await {
            Ok(Some(workflow)) => Some(CustomerApproval {
                share_id: workflow.share_id,
                requested_at: Some(Utc::now()),
                approved_at: None,
            }),
            Ok(None) => {
                log::warn!("approval {} not found; version created without it", approval_id);
                None
            }
            Err(err) => {
                log::warn!(
                    "approval lookup for {} failed; version created without it: {}",
                    approval_id,
                    err
                );
                None
            }
        }
    }

    /// Point the campaign at its newest version; lock it when the
    /// version went out for approval. A missing campaign degrades.
    async fn update_campaign_after_create(
        &self,
        campaign_id: &str,
        version_id: &str,
        lock: bool,
    ) -> LedgerResult<()> {
        let Some(mut campaign) = self.store.fetch_campaign(campaign_id).await? else {
            log::warn!(
                "campaign {} not found while recording version {}",
                campaign_id,
                version_id
            );
            return Ok(());
        };
        campaign.current_document_version = Some(version_id.to_string());
        if lock {
            self.lock_fields(&mut campaign, EditLockReason::PendingCustomerApproval);
        }
        campaign.updated_at = Utc::now();
        self.store.update_campaign(&campaign).await?;
        if lock {
            self.notify_lock_change(campaign_id, true, Some(EditLockReason::PendingCustomerApproval))
                .await;
        }
        Ok(())
    }

    /// Transition a version's status and re-derive the owning campaign's
    /// edit lock as a pure function of the new status.
    pub async fn update_version_status(
        &self,
        version_id: &str,
        new_status: DocumentVersionStatus,
        approval_id: Option<&str>,
    ) -> LedgerResult<DocumentVersionRecord> {
        let mut version = self
            .store
            .get_version(version_id)
            .await?
            .ok_or_else(|| LedgerError::VersionNotFound(version_id.to_string()))?;

        version.status = new_status.clone();
        if let Some(approval_id) = approval_id {
            version.approval_id = Some(approval_id.to_string());
        }
        if new_status == DocumentVersionStatus::Approved {
            if let Some(approval) = version.customer_approval.as_mut() {
                approval.approved_at = Some(Utc::now());
            }
        }
        version.updated_at = Utc::now();
        self.store.update_version(&version).await?;

        if let Some(directive) = lock_directive_for(&new_status) {
            self.apply_lock_directive(&version.campaign_id, directive)
                .await?;
        }
        Ok(version)
    }

    async fn apply_lock_directive(
        &self,
        campaign_id: &str,
        directive: LockDirective,
    ) -> LedgerResult<()> {
        let Some(mut campaign) = self.store.fetch_campaign(campaign_id).await? else {
            log::warn!("campaign {} not found while applying lock change", campaign_id);
            return Ok(());
        };
        let (locked, reason) = match directive {
            LockDirective::Lock(reason) => {
                self.lock_fields(&mut campaign, reason);
                (true, Some(reason))
            }
            LockDirective::Unlock => {
                self.unlock_fields(&mut campaign);
                (false, None)
            }
        };
        campaign.updated_at = Utc::now();
        self.store.update_campaign(&campaign).await?;
        self.notify_lock_change(campaign_id, locked, reason).await;
        Ok(())
    }

    fn lock_fields(&self, campaign: &mut CampaignRecord, reason: EditLockReason) {
        campaign.edit_locked = true;
        campaign.edit_locked_reason = Some(reason);
        campaign.locked_at = Some(Utc::now());
    }

    fn unlock_fields(&self, campaign: &mut CampaignRecord) {
        campaign.edit_locked = false;
        campaign.edit_locked_reason = None;
        campaign.unlocked_at = Some(Utc::now());
    }

    async fn notify_lock_change(
        &self,
        campaign_id: &str,
        locked: bool,
        reason: Option<EditLockReason>,
    ) {
        let note = Notification::EditLockChanged {
            campaign_id: campaign_id.to_string(),
            locked,
            reason: reason.map(|r| {
                serde_json::to_value(r)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default()
            }),
        };
        if let Err(err) = self.notifier.send(&note).await {
            log::warn!("lock-change notification for {} failed: {}", campaign_id, err);
        }
    }

    /// Attach a version to an approval workflow, moving it into the
    /// customer-review state.
    pub async fn link_version_to_approval(
        &self,
        version_id: &str,
        approval_id: &str,
    ) -> LedgerResult<DocumentVersionRecord> {
        let mut version = self
            .store
            .get_version(version_id)
            .await?
            .ok_or_else(|| LedgerError::VersionNotFound(version_id.to_string()))?;

        version.approval_id = Some(approval_id.to_string());
        version.status = DocumentVersionStatus::PendingCustomer;
        version.linked_at = Some(Utc::now());
        version.updated_at = Utc::now();
        self.store.update_version(&version).await?;
        Ok(version)
    }

    /// All versions of a campaign the caller may see, newest first,
    /// capped by the configured history limit.
    pub async fn get_version_history(
        &self,
        campaign_id: &str,
        ctx: &OrgContext,
    ) -> LedgerResult<Vec<DocumentVersionRecord>> {
        let mut versions = self.store.list_versions_by_campaign(campaign_id).await?;
        versions.retain(|v| v.organization_id == ctx.organization_id);
        versions.truncate(self.config.history_limit);
        Ok(versions)
    }

    /// The highest-numbered version of a campaign, if any.
    pub async fn get_current_version(
        &self,
        campaign_id: &str,
        ctx: &OrgContext,
    ) -> LedgerResult<Option<DocumentVersionRecord>> {
        Ok(self
            .get_version_history(campaign_id, ctx)
            .await?
            .into_iter()
            .next())
    }

    /// Lock status read; degrades to "unlocked" instead of failing.
    pub async fn get_edit_lock_status(
        &self,
        campaign_id: &str,
        ctx: &OrgContext,
    ) -> EditLockStatus {
        match self.store.get_campaign(campaign_id, &ctx.organization_id).await {
            Ok(Some(campaign)) => EditLockStatus {
                is_locked: campaign.edit_locked,
                reason: campaign.edit_locked_reason,
                locked_at: campaign.locked_at,
                can_request_unlock: campaign.can_request_unlock(),
            },
            Ok(None) => EditLockStatus {
                is_locked: false,
                reason: None,
                locked_at: None,
                can_request_unlock: false,
            },
            Err(err) => {
                log::warn!("lock status read failed for {}: {}", campaign_id, err);
                EditLockStatus {
                    is_locked: false,
                    reason: None,
                    locked_at: None,
                    can_request_unlock: false,
                }
            }
        }
    }

    /// File an operator request to lift the campaign's edit lock.
    /// Requires the campaign to be locked and no pending request.
    pub async fn request_unlock(
        &self,
        campaign_id: &str,
        requested_by: Requester,
        reason: impl Into<String>,
        ctx: &OrgContext,
    ) -> LedgerResult<String> {
        let mut campaign = self
            .store
            .get_campaign(campaign_id, &ctx.organization_id)
            .await?
            .ok_or_else(|| LedgerError::CampaignNotFound(campaign_id.to_string()))?;

        if !campaign.edit_locked {
            return Err(LedgerError::CampaignNotLocked(campaign_id.to_string()));
        }
        if !campaign.can_request_unlock() {
            return Err(LedgerError::PendingUnlockRequest(campaign_id.to_string()));
        }

        let request = UnlockRequest {
            id: new_record_id(),
            campaign_id: campaign_id.to_string(),
            requested_by,
            reason: reason.into(),
            status: UnlockRequestStatus::Pending,
            requested_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        };
        let request_id = request.id.clone();
        campaign.unlock_requests.push(request);
        campaign.updated_at = Utc::now();
        self.store.update_campaign(&campaign).await?;

        log::info!("unlock requested for campaign {} ({})", campaign_id, request_id);
        Ok(request_id)
    }

    /// Approve a pending unlock request and clear the lock
    /// unconditionally, superseding whatever the last version
    /// transition set.
    pub async fn approve_unlock_request(
        &self,
        campaign_id: &str,
        request_id: &str,
        approver: Requester,
        ctx: &OrgContext,
    ) -> LedgerResult<()> {
        let mut campaign = self
            .store
            .get_campaign(campaign_id, &ctx.organization_id)
            .await?
            .ok_or_else(|| LedgerError::CampaignNotFound(campaign_id.to_string()))?;
        if !campaign.edit_locked {
            return Err(LedgerError::CampaignNotLocked(campaign_id.to_string()));
        }

        Self::resolve_request(&mut campaign, request_id, UnlockRequestStatus::Approved, approver)?;
        self.unlock_fields(&mut campaign);
        campaign.updated_at = Utc::now();
        self.store.update_campaign(&campaign).await?;
        self.notify_lock_change(campaign_id, false, None).await;
        Ok(())
    }

    /// Reject a pending unlock request; the lock stays in place.
    pub async fn reject_unlock_request(
        &self,
        campaign_id: &str,
        request_id: &str,
        approver: Requester,
        ctx: &OrgContext,
    ) -> LedgerResult<()> {
        let mut campaign = self
            .store
            .get_campaign(campaign_id, &ctx.organization_id)
            .await?
            .ok_or_else(|| LedgerError::CampaignNotFound(campaign_id.to_string()))?;
        if !campaign.edit_locked {
            return Err(LedgerError::CampaignNotLocked(campaign_id.to_string()));
        }

        Self::resolve_request(&mut campaign, request_id, UnlockRequestStatus::Rejected, approver)?;
        campaign.updated_at = Utc::now();
        self.store.update_campaign(&campaign).await?;
        Ok(())
    }

    fn resolve_request(
        campaign: &mut CampaignRecord,
        request_id: &str,
        outcome: UnlockRequestStatus,
        resolver: Requester,
    ) -> LedgerResult<()> {
        let request = campaign
            .unlock_requests
            .iter_mut()
            .find(|r| r.id == request_id && r.status == UnlockRequestStatus::Pending)
            .ok_or_else(|| LedgerError::UnlockRequestNotFound(request_id.to_string()))?;
        request.status = outcome;
        request.resolved_at = Some(Utc::now());
        request.resolved_by = Some(resolver);
        Ok(())
    }

    /// Delete all but the newest `keep` draft versions of a campaign.
    /// Non-draft versions are never touched, and at least one version
    /// always survives so the campaign's number sequence cannot restart.
    /// Returns the number deleted.
    pub async fn delete_old_draft_versions(
        &self,
        campaign_id: &str,
        keep: Option<usize>,
    ) -> LedgerResult<usize> {
        let keep = keep.unwrap_or(self.config.keep_draft_versions).max(1);
        let versions = self.store.list_versions_by_campaign(campaign_id).await?;
        let stale: Vec<_> = versions
            .iter()
            .filter(|v| v.status == DocumentVersionStatus::Draft)
            .skip(keep)
            .collect();

        let mut deleted = 0;
        for version in stale {
            self.store.delete_version(&version.id).await?;
            deleted += 1;
        }
        if deleted > 0 {
            log::info!(
                "deleted {} old draft version(s) for campaign {}",
                deleted,
                campaign_id
            );
        }
        Ok(deleted)
    }
}

/// Word count of an HTML body with tags stripped.
fn count_words(html: &str) -> usize {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.split_whitespace().count()
}

/// Page estimate at 300 words per page, minimum one page.
fn estimate_pages(word_count: usize) -> usize {
    (word_count.max(1)).div_ceil(300)
}

fn format_file_name(title: &str, version: u32, at: &chrono::DateTime<Utc>) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_v{}_{}.pdf", sanitized, version, at.format("%Y-%m-%d"))
}
