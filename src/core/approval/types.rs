//! Data models for sign-off workflows: stages, recipients, history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall outcome state of a sign-off workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApprovalStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Unknown(String),
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Terminal outcomes admit no further progression.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl From<String> for ApprovalStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "draft" => Self::Draft,
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ApprovalStatus> for String {
    fn from(status: ApprovalStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered phase of recipients who must all approve before the
/// workflow advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Team,
    Customer,
    Final,
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Team => "team",
            Self::Customer => "customer",
            Self::Final => "final",
        };
        f.write_str(s)
    }
}

/// Which side of the table a recipient sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    Internal,
    Customer,
}

/// A single recipient's decision state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientDecision {
    Pending,
    Approved,
    Rejected,
}

/// One person asked to sign off, bound to exactly one workflow stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecipientType,
    pub email: String,
    pub name: String,
    pub stage: WorkflowStage,
    pub status: RecipientDecision,
    /// Immutable once set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<RecipientDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub notifications_sent: u32,
    /// Stable ranking within the recipient's stage.
    pub order: u32,
}

/// Stage progression bookkeeping on the workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowProgress {
    /// Declared stages in the order they must complete.
    pub stages: Vec<WorkflowStage>,
    pub current_stage: WorkflowStage,
    pub is_multi_stage: bool,
}

impl WorkflowProgress {
    /// The declared stage after `stage`, if any.
    pub fn stage_after(&self, stage: WorkflowStage) -> Option<WorkflowStage> {
        let pos = self.stages.iter().position(|s| *s == stage)?;
        self.stages.get(pos + 1).copied()
    }

    pub fn is_last_stage(&self, stage: WorkflowStage) -> bool {
        self.stages.last() == Some(&stage)
    }
}

/// What happened, for the workflow's append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEventKind {
    Created,
    DecisionRecorded,
    StageAdvanced,
    Completed,
    DocumentStatusObserved,
}

/// One entry in a workflow's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub at: DateTime<Utc>,
    pub kind: WorkflowEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub detail: String,
}

impl WorkflowEvent {
    pub fn now(kind: WorkflowEventKind, actor: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            kind,
            actor,
            detail: detail.into(),
        }
    }
}

/// The sign-off workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalWorkflowRecord {
    pub id: String,
    pub organization_id: String,
    pub campaign_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Token granting link-based access for recipients.
    pub share_id: String,
    pub status: ApprovalStatus,
    pub workflow: WorkflowProgress,
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub history: Vec<WorkflowEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ApprovalWorkflowRecord {
    pub fn recipients_in_stage(&self, stage: WorkflowStage) -> impl Iterator<Item = &Recipient> {
        self.recipients.iter().filter(move |r| r.stage == stage)
    }
}

/// A team member asked to approve during the internal stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamApprover {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
}

/// The customer-side contact asked to approve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Caller-supplied sign-off configuration for a campaign.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalConfig {
    pub team_approval_required: bool,
    #[serde(default)]
    pub team_approvers: Vec<TeamApprover>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_approval_message: Option<String>,
    pub customer_approval_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_contact: Option<CustomerContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_approval_message: Option<String>,
    /// Reuse an existing share id (retry of a previous attempt).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,
}

impl ApprovalConfig {
    pub fn requires_approval(&self) -> bool {
        self.team_approval_required || self.customer_approval_required
    }

    /// The declared stage list this configuration yields.
    pub fn stages(&self) -> Vec<WorkflowStage> {
        let mut stages = Vec::new();
        if self.team_approval_required {
            stages.push(WorkflowStage::Team);
        }
        if self.customer_approval_required {
            stages.push(WorkflowStage::Customer);
        }
        stages
    }
}

/// Per-audience shareable links, present only for declared stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareableLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
}

/// Result of starting a workflow.
#[derive(Debug, Clone)]
pub struct StartedWorkflow {
    pub workflow_id: String,
    pub share_id: String,
    pub shareable_links: ShareableLinks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_stage_derivation() {
        let both = ApprovalConfig {
            team_approval_required: true,
            customer_approval_required: true,
            ..Default::default()
        };
        assert_eq!(both.stages(), vec![WorkflowStage::Team, WorkflowStage::Customer]);

        let customer_only = ApprovalConfig {
            customer_approval_required: true,
            ..Default::default()
        };
        assert_eq!(customer_only.stages(), vec![WorkflowStage::Customer]);

        let none = ApprovalConfig::default();
        assert!(none.stages().is_empty());
        assert!(!none.requires_approval());
    }

    #[test]
    fn test_stage_after() {
        let progress = WorkflowProgress {
            stages: vec![WorkflowStage::Team, WorkflowStage::Customer],
            current_stage: WorkflowStage::Team,
            is_multi_stage: true,
        };
        assert_eq!(
            progress.stage_after(WorkflowStage::Team),
            Some(WorkflowStage::Customer)
        );
        assert_eq!(progress.stage_after(WorkflowStage::Customer), None);
        assert!(progress.is_last_stage(WorkflowStage::Customer));
        assert!(!progress.is_last_stage(WorkflowStage::Team));
    }

    #[test]
    fn test_approval_status_unknown_roundtrip() {
        let status: ApprovalStatus = serde_json::from_str("\"escalated\"").unwrap();
        assert_eq!(status, ApprovalStatus::Unknown("escalated".to_string()));
        assert!(!status.is_terminal());
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"escalated\"");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Rejected.is_terminal());
        assert!(!ApprovalStatus::Pending.is_terminal());
        assert!(!ApprovalStatus::Draft.is_terminal());
    }
}
