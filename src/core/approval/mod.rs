//! Sign-off workflows: records, stage progression and the service that
//! drives them.

pub mod types;
pub mod workflow;

pub use types::{
    ApprovalConfig, ApprovalStatus, ApprovalWorkflowRecord, CustomerContact, Recipient,
    RecipientDecision, RecipientType, ShareableLinks, StartedWorkflow, TeamApprover,
    WorkflowEvent, WorkflowEventKind, WorkflowProgress, WorkflowStage,
};
pub use workflow::{ApprovalError, ApprovalResult, ApprovalWorkflowService};
