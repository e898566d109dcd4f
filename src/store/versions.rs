//! Document-version collection operations.
//!
//! Version numbers are allocated here, inside the collection's write
//! lock, so two concurrent inserts for the same campaign always receive
//! distinct consecutive numbers.

use super::error::{StoreError, StoreResult};
use super::Store;
use crate::core::documents::DocumentVersionRecord;

/// Extension trait for document-version operations.
pub trait VersionStore {
    /// Insert a version, assigning it the next number for its campaign.
    /// Returns the assigned number.
    fn insert_version(
        &self,
        version: &DocumentVersionRecord,
    ) -> impl std::future::Future<Output = StoreResult<u32>> + Send;

    fn get_version(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = StoreResult<Option<DocumentVersionRecord>>> + Send;

    /// Single-document replace; fails if the version does not exist.
    fn update_version(
        &self,
        version: &DocumentVersionRecord,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;

    /// All versions of a campaign, highest number first.
    fn list_versions_by_campaign(
        &self,
        campaign_id: &str,
    ) -> impl std::future::Future<Output = StoreResult<Vec<DocumentVersionRecord>>> + Send;

    fn delete_version(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;
}

impl VersionStore for Store {
    async fn insert_version(&self, version: &DocumentVersionRecord) -> StoreResult<u32> {
        let mut versions = self.versions.write().await;
        if versions.contains_key(&version.id) {
            return Err(StoreError::conflict(format!(
                "versions/{} already exists",
                version.id
            )));
        }
        let next = versions
            .values()
            .filter(|v| v.campaign_id == version.campaign_id)
            .map(|v| v.version)
            .max()
            .unwrap_or(0)
            + 1;
        let mut stored = version.clone();
        stored.version = next;
        versions.insert(stored.id.clone(), stored);
        Ok(next)
    }

    async fn get_version(&self, id: &str) -> StoreResult<Option<DocumentVersionRecord>> {
        let versions = self.versions.read().await;
        Ok(versions.get(id).cloned())
    }

    async fn update_version(&self, version: &DocumentVersionRecord) -> StoreResult<()> {
        let mut versions = self.versions.write().await;
        if !versions.contains_key(&version.id) {
            return Err(StoreError::not_found(format!("versions/{}", version.id)));
        }
        versions.insert(version.id.clone(), version.clone());
        Ok(())
    }

    async fn list_versions_by_campaign(
        &self,
        campaign_id: &str,
    ) -> StoreResult<Vec<DocumentVersionRecord>> {
        let versions = self.versions.read().await;
        let mut matched: Vec<_> = versions
            .values()
            .filter(|v| v.campaign_id == campaign_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(matched)
    }

    async fn delete_version(&self, id: &str) -> StoreResult<()> {
        let mut versions = self.versions.write().await;
        if versions.remove(id).is_none() {
            return Err(StoreError::not_found(format!("versions/{}", id)));
        }
        Ok(())
    }
}
