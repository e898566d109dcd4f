//! Domain services: approval workflows, document versioning, the
//! delivery pipeline gate and the bridge that orchestrates them.

pub mod approval;
pub mod bridge;
pub mod campaign;
pub mod context;
pub mod documents;
pub mod notify;
pub mod pipeline;
pub mod render;

pub use approval::{ApprovalError, ApprovalStatus, ApprovalWorkflowService};
pub use bridge::{ApprovalPipelineBridge, BridgeError, CampaignApprovalResult};
pub use campaign::{CampaignRecord, CampaignStatus};
pub use context::OrgContext;
pub use documents::{DocumentVersionLedger, DocumentVersionStatus, LedgerError};
pub use notify::{LogNotifier, NotificationSender, NullNotifier};
pub use pipeline::{GateError, PipelineStage, PipelineStageGate};
pub use render::{DocumentRenderer, LocalRenderer, RenderError};
