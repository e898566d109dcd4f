//! Campaign records: the press-release artifact under approval.
//!
//! A campaign's `edit_locked` flag is derived state. It is never set by a
//! direct user action; only document-version status transitions and
//! resolved unlock requests may change it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::documents::EditLockReason;

/// Overall campaign status as seen by the authoring surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    InReview,
    Approved,
    ChangesRequested,
}

/// Editable source content of a campaign; snapshotted into every
/// generated document version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignContent {
    pub title: String,
    /// Main body as HTML.
    pub main_content: String,
    #[serde(default)]
    pub boilerplate_sections: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_visual: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

/// Who performed a lock/unlock action, kept for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockActor {
    pub user_id: String,
    pub display_name: String,
    pub action: String,
}

/// Resolution state of an unlock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A user identity attached to an unlock request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: String,
    pub display_name: String,
}

/// An operator request to lift a campaign's edit lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub id: String,
    pub campaign_id: String,
    pub requested_by: Requester,
    pub reason: String,
    pub status: UnlockRequestStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<Requester>,
}

/// The press-release campaign document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub id: String,
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub status: CampaignStatus,
    pub content: CampaignContent,

    /// Derived edit-lock state; see module docs.
    #[serde(default)]
    pub edit_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_locked_reason: Option<EditLockReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<LockActor>,
    #[serde(default)]
    pub unlock_requests: Vec<UnlockRequest>,

    /// Id of the newest generated document version, when any exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document_version: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignRecord {
    /// Fresh, unlocked draft campaign.
    pub fn new(
        id: impl Into<String>,
        organization_id: impl Into<String>,
        content: CampaignContent,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
            project_id: None,
            status: CampaignStatus::Draft,
            content,
            edit_locked: false,
            edit_locked_reason: None,
            locked_at: None,
            unlocked_at: None,
            locked_by: None,
            unlock_requests: Vec::new(),
            current_document_version: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a new unlock request may be filed right now.
    pub fn can_request_unlock(&self) -> bool {
        self.edit_locked
            && !self
                .unlock_requests
                .iter()
                .any(|r| r.status == UnlockRequestStatus::Pending)
    }
}
