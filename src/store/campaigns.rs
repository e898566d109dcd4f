//! Campaign collection operations.

use super::error::{StoreError, StoreResult};
use super::Store;
use crate::core::campaign::CampaignRecord;

/// Extension trait for campaign document operations.
pub trait CampaignStore {
    /// Insert a new campaign; the id must not already exist.
    fn create_campaign(
        &self,
        campaign: &CampaignRecord,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;

    /// Tenant-scoped read: `None` when absent or owned by another
    /// organization (the two are indistinguishable).
    fn get_campaign(
        &self,
        id: &str,
        organization_id: &str,
    ) -> impl std::future::Future<Output = StoreResult<Option<CampaignRecord>>> + Send;

    /// Unscoped read for internal state transitions (lock derivation,
    /// version pointer updates) that act on behalf of the system.
    fn fetch_campaign(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = StoreResult<Option<CampaignRecord>>> + Send;

    /// Single-document replace; fails if the campaign does not exist.
    fn update_campaign(
        &self,
        campaign: &CampaignRecord,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;
}

impl CampaignStore for Store {
    async fn create_campaign(&self, campaign: &CampaignRecord) -> StoreResult<()> {
        let mut campaigns = self.campaigns.write().await;
        if campaigns.contains_key(&campaign.id) {
            return Err(StoreError::conflict(format!(
                "campaigns/{} already exists",
                campaign.id
            )));
        }
        campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(())
    }

    async fn get_campaign(
        &self,
        id: &str,
        organization_id: &str,
    ) -> StoreResult<Option<CampaignRecord>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns
            .get(id)
            .filter(|c| c.organization_id == organization_id)
            .cloned())
    }

    async fn fetch_campaign(&self, id: &str) -> StoreResult<Option<CampaignRecord>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns.get(id).cloned())
    }

    async fn update_campaign(&self, campaign: &CampaignRecord) -> StoreResult<()> {
        let mut campaigns = self.campaigns.write().await;
        if !campaigns.contains_key(&campaign.id) {
            return Err(StoreError::not_found(format!("campaigns/{}", campaign.id)));
        }
        campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::campaign::CampaignContent;

    fn sample(id: &str, org: &str) -> CampaignRecord {
        CampaignRecord::new(id, org, CampaignContent::default())
    }

    #[tokio::test]
    async fn test_create_and_get_scoped() {
        let store = Store::new();
        store.create_campaign(&sample("camp-1", "org-1")).await.unwrap();

        let found = store.get_campaign("camp-1", "org-1").await.unwrap();
        assert!(found.is_some());

        // Cross-tenant read looks exactly like absence
        let cross = store.get_campaign("camp-1", "org-2").await.unwrap();
        assert!(cross.is_none());
        let missing = store.get_campaign("camp-9", "org-1").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let store = Store::new();
        store.create_campaign(&sample("camp-1", "org-1")).await.unwrap();
        let err = store.create_campaign(&sample("camp-1", "org-1")).await;
        assert!(matches!(err, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_missing_campaign_fails() {
        let store = Store::new();
        let err = store.update_campaign(&sample("camp-1", "org-1")).await;
        assert!(matches!(err, Err(StoreError::NotFound(_))));
    }
}
