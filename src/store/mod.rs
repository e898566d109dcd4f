//! Keyed document store for the approval/pipeline core.
//!
//! One collection per entity type (campaigns, projects, workflows,
//! document versions) with get-by-id, scoped list-by-field-equality and
//! single-document writes. The embedded implementation keeps each
//! collection behind its own `RwLock`; per-campaign version numbering is
//! allocated inside the collection's write lock so concurrent creators
//! can never observe the same number.
//!
//! Per-entity operations live in extension traits (`CampaignStore`,
//! `ProjectStore`, `WorkflowStore`, `VersionStore`) implemented for
//! [`Store`].

pub mod campaigns;
pub mod error;
pub mod projects;
pub mod versions;
pub mod workflows;

use std::collections::HashMap;

use rand::Rng;
use tokio::sync::RwLock;

use crate::core::approval::ApprovalWorkflowRecord;
use crate::core::campaign::CampaignRecord;
use crate::core::documents::DocumentVersionRecord;
use crate::core::pipeline::ProjectRecord;

pub use campaigns::CampaignStore;
pub use error::{StoreError, StoreResult};
pub use projects::ProjectStore;
pub use versions::VersionStore;
pub use workflows::WorkflowStore;

/// Embedded document store.
#[derive(Default)]
pub struct Store {
    pub(crate) campaigns: RwLock<HashMap<String, CampaignRecord>>,
    pub(crate) projects: RwLock<HashMap<String, ProjectRecord>>,
    pub(crate) workflows: RwLock<HashMap<String, ApprovalWorkflowRecord>>,
    pub(crate) versions: RwLock<HashMap<String, DocumentVersionRecord>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Fresh document id for any collection.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

const SHARE_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SHARE_ID_LEN: usize = 20;

/// Fresh 20-character lowercase-alphanumeric share token for
/// link-based approval access.
pub fn new_share_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SHARE_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SHARE_ID_ALPHABET.len());
            SHARE_ID_ALPHABET[idx] as char
        })
        .collect()
}
