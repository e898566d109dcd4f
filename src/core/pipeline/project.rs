//! Project records: the delivery container that moves through the
//! pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stages::PipelineStage;

/// A delivery project. Campaigns link into a project; the project's
/// current stage gates what its campaigns may do next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    pub current_stage: PipelineStage,
    /// Campaigns attached to this project, in link order.
    #[serde(default)]
    pub linked_campaign_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_updated_by: Option<String>,
    /// Caller-supplied payload merged in on stage transitions
    /// (notes, sign-off metadata); opaque to the gate itself.
    #[serde(flatten)]
    pub transition_data: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    /// Fresh project at the first pipeline stage.
    pub fn new(
        id: impl Into<String>,
        organization_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
            title: title.into(),
            current_stage: PipelineStage::IdeasPlanning,
            linked_campaign_ids: Vec::new(),
            stage_updated_at: None,
            stage_updated_by: None,
            transition_data: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_starts_at_first_stage() {
        let project = ProjectRecord::new("proj-1", "org-1", "Spring launch");
        assert_eq!(project.current_stage, PipelineStage::IdeasPlanning);
        assert!(project.linked_campaign_ids.is_empty());
        assert!(project.stage_updated_at.is_none());
    }

    #[test]
    fn test_transition_data_flattens() {
        let mut project = ProjectRecord::new("proj-1", "org-1", "Spring launch");
        project.transition_data.insert(
            "stage_notes".to_string(),
            serde_json::Value::String("kickoff done".to_string()),
        );
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["stage_notes"], "kickoff done");
    }
}
