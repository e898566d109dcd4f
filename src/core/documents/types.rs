//! Data models for document versions and the derived campaign edit lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a generated document version.
///
/// Closed vocabulary with an `Unknown` fallback so records written by a
/// newer deployment still deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentVersionStatus {
    Draft,
    PendingCustomer,
    Approved,
    Rejected,
    Unknown(String),
}

impl DocumentVersionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::PendingCustomer => "pending_customer",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Unknown(s) => s.as_str(),
        }
    }
}

impl From<String> for DocumentVersionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "draft" => Self::Draft,
            "pending_customer" => Self::PendingCustomer,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Unknown(value),
        }
    }
}

impl From<DocumentVersionStatus> for String {
    fn from(status: DocumentVersionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for DocumentVersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a campaign is currently locked against content edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditLockReason {
    PendingCustomerApproval,
    PendingTeamApproval,
    ApprovedFinal,
    SystemProcessing,
    ManualLock,
}

/// What a document status transition does to the owning campaign's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDirective {
    Lock(EditLockReason),
    Unlock,
}

/// Derived lock state for a document status transition.
///
/// The campaign lock is a pure function of the version's new status; prior
/// lock state never enters the computation. `Unknown` statuses leave the
/// lock untouched.
pub fn lock_directive_for(status: &DocumentVersionStatus) -> Option<LockDirective> {
    match status {
        DocumentVersionStatus::Approved => {
            Some(LockDirective::Lock(EditLockReason::ApprovedFinal))
        }
        DocumentVersionStatus::PendingCustomer => {
            Some(LockDirective::Lock(EditLockReason::PendingCustomerApproval))
        }
        DocumentVersionStatus::Rejected | DocumentVersionStatus::Draft => {
            Some(LockDirective::Unlock)
        }
        DocumentVersionStatus::Unknown(_) => None,
    }
}

/// Customer-facing approval metadata attached to a version that was
/// created for sign-off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerApproval {
    pub share_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

/// Immutable copy of the campaign content at the moment the version was
/// generated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub title: String,
    /// Main body as HTML.
    pub main_content: String,
    #[serde(default)]
    pub boilerplate_sections: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_visual: Option<serde_json::Value>,
    /// True when the version was generated to be sent out for sign-off.
    #[serde(default)]
    pub created_for_approval: bool,
}

/// Generation statistics recorded alongside a version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub word_count: usize,
    pub page_count: usize,
    pub generation_time_ms: u64,
}

/// An immutable, numbered rendering of a campaign's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersionRecord {
    pub id: String,
    pub campaign_id: String,
    pub organization_id: String,
    /// 1-based, monotonic per campaign; assigned by the store at insert.
    pub version: u32,
    pub status: DocumentVersionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_approval: Option<CustomerApproval>,
    pub download_url: String,
    pub file_name: String,
    pub file_size: u64,
    pub content_snapshot: ContentSnapshot,
    #[serde(default)]
    pub metadata: VersionMetadata,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_derivation_table() {
        assert_eq!(
            lock_directive_for(&DocumentVersionStatus::Approved),
            Some(LockDirective::Lock(EditLockReason::ApprovedFinal))
        );
        assert_eq!(
            lock_directive_for(&DocumentVersionStatus::PendingCustomer),
            Some(LockDirective::Lock(EditLockReason::PendingCustomerApproval))
        );
        assert_eq!(
            lock_directive_for(&DocumentVersionStatus::Rejected),
            Some(LockDirective::Unlock)
        );
        assert_eq!(
            lock_directive_for(&DocumentVersionStatus::Draft),
            Some(LockDirective::Unlock)
        );
        assert_eq!(
            lock_directive_for(&DocumentVersionStatus::Unknown("archived".into())),
            None
        );
    }

    #[test]
    fn test_status_serde_roundtrip() {
        let status: DocumentVersionStatus =
            serde_json::from_str("\"pending_customer\"").unwrap();
        assert_eq!(status, DocumentVersionStatus::PendingCustomer);
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            "\"pending_customer\""
        );

        let unknown: DocumentVersionStatus = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(
            unknown,
            DocumentVersionStatus::Unknown("archived".to_string())
        );
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"archived\"");
    }

    #[test]
    fn test_lock_reason_serde() {
        assert_eq!(
            serde_json::to_string(&EditLockReason::PendingCustomerApproval).unwrap(),
            "\"pending_customer_approval\""
        );
        assert_eq!(
            serde_json::to_string(&EditLockReason::ApprovedFinal).unwrap(),
            "\"approved_final\""
        );
    }
}
