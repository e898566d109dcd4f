//! Notification seam.
//!
//! Deliveries are fire-and-forget: callers count attempts but never let a
//! delivery failure fail the surrounding operation.

use serde::{Deserialize, Serialize};

use super::approval::WorkflowStage;

/// An outbound message about an approval workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A recipient is asked to review and sign off.
    ApprovalRequested {
        workflow_id: String,
        recipient_email: String,
        recipient_name: String,
        stage: WorkflowStage,
        link: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The workflow reached a terminal outcome.
    WorkflowCompleted {
        workflow_id: String,
        recipient_email: String,
        approved: bool,
    },
    /// A campaign's edit lock changed state.
    EditLockChanged {
        campaign_id: String,
        locked: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// Delivers notifications to recipients.
pub trait NotificationSender: Send + Sync {
    /// Best-effort delivery; errors are logged by the caller, never
    /// propagated.
    fn send(
        &self,
        notification: &Notification,
    ) -> impl std::future::Future<Output = Result<(), String>> + Send;
}

/// Logs deliveries instead of sending them.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationSender for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), String> {
        match notification {
            Notification::ApprovalRequested {
                workflow_id,
                recipient_email,
                stage,
                ..
            } => {
                log::info!(
                    "approval request for workflow {} -> {} (stage {})",
                    workflow_id,
                    recipient_email,
                    stage
                );
            }
            Notification::WorkflowCompleted {
                workflow_id,
                recipient_email,
                approved,
            } => {
                log::info!(
                    "workflow {} completed (approved={}) -> {}",
                    workflow_id,
                    approved,
                    recipient_email
                );
            }
            Notification::EditLockChanged {
                campaign_id,
                locked,
                reason,
            } => {
                log::info!(
                    "campaign {} edit lock -> {} ({})",
                    campaign_id,
                    locked,
                    reason.as_deref().unwrap_or("no reason")
                );
            }
        }
        Ok(())
    }
}

/// Discards every notification. Useful in tests that only assert on
/// stored state.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl NotificationSender for NullNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_notifier_accepts_everything() {
        let notifier = NullNotifier;
        let note = Notification::WorkflowCompleted {
            workflow_id: "wf-1".to_string(),
            recipient_email: "a@b.test".to_string(),
            approved: true,
        };
        assert!(notifier.send(&note).await.is_ok());
    }
}
