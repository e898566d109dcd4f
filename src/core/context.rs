//! Tenant/caller context threaded through every scoped operation.

use serde::{Deserialize, Serialize};

/// Identifies the organization and acting user behind a service call.
///
/// Every tenant-scoped read compares the stored `organization_id` against
/// this context; a mismatch is reported exactly like absence so callers
/// cannot distinguish "does not exist" from "not yours".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgContext {
    pub organization_id: String,
    pub user_id: String,
}

impl OrgContext {
    pub fn new(organization_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            user_id: user_id.into(),
        }
    }
}
