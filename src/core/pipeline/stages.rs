//! Pipeline stage vocabulary and the fixed delivery order.

use serde::{Deserialize, Serialize};

/// A project's position in the fixed delivery lifecycle.
///
/// The set is closed but stored data may carry values written by newer
/// deployments, so an `Unknown` fallback preserves unrecognized strings
/// instead of failing deserialization. Unknown stages never block
/// progression; they simply have no successor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PipelineStage {
    IdeasPlanning,
    Creation,
    Review,
    Approval,
    Distribution,
    Monitoring,
    Completed,
    Unknown(String),
}

/// The total order stages advance through.
const STAGE_ORDER: [PipelineStage; 7] = [
    PipelineStage::IdeasPlanning,
    PipelineStage::Creation,
    PipelineStage::Review,
    PipelineStage::Approval,
    PipelineStage::Distribution,
    PipelineStage::Monitoring,
    PipelineStage::Completed,
];

impl PipelineStage {
    pub fn as_str(&self) -> &str {
        match self {
            Self::IdeasPlanning => "ideas_planning",
            Self::Creation => "creation",
            Self::Review => "review",
            Self::Approval => "approval",
            Self::Distribution => "distribution",
            Self::Monitoring => "monitoring",
            Self::Completed => "completed",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// The stage that follows this one, `None` at `completed` and for
    /// values outside the known set.
    pub fn next_stage(&self) -> Option<PipelineStage> {
        let pos = STAGE_ORDER.iter().position(|s| s == self)?;
        STAGE_ORDER.get(pos + 1).cloned()
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for PipelineStage {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ideas_planning" => Self::IdeasPlanning,
            "creation" => Self::Creation,
            "review" => Self::Review,
            "approval" => Self::Approval,
            "distribution" => Self::Distribution,
            "monitoring" => Self::Monitoring,
            "completed" => Self::Completed,
            _ => Self::Unknown(value),
        }
    }
}

impl From<PipelineStage> for String {
    fn from(stage: PipelineStage) -> Self {
        stage.as_str().to_string()
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_total() {
        assert_eq!(
            PipelineStage::IdeasPlanning.next_stage(),
            Some(PipelineStage::Creation)
        );
        assert_eq!(
            PipelineStage::Creation.next_stage(),
            Some(PipelineStage::Review)
        );
        assert_eq!(
            PipelineStage::Review.next_stage(),
            Some(PipelineStage::Approval)
        );
        assert_eq!(
            PipelineStage::Approval.next_stage(),
            Some(PipelineStage::Distribution)
        );
        assert_eq!(
            PipelineStage::Distribution.next_stage(),
            Some(PipelineStage::Monitoring)
        );
        assert_eq!(
            PipelineStage::Monitoring.next_stage(),
            Some(PipelineStage::Completed)
        );
        assert_eq!(PipelineStage::Completed.next_stage(), None);
    }

    #[test]
    fn test_unknown_stage_has_no_successor() {
        let stage = PipelineStage::from("beta_rollout".to_string());
        assert_eq!(stage, PipelineStage::Unknown("beta_rollout".to_string()));
        assert_eq!(stage.next_stage(), None);
        assert!(!stage.is_known());
    }

    #[test]
    fn test_serde_roundtrip_preserves_unknown() {
        let json = "\"beta_rollout\"";
        let stage: PipelineStage = serde_json::from_str(json).unwrap();
        assert_eq!(stage, PipelineStage::Unknown("beta_rollout".to_string()));
        assert_eq!(serde_json::to_string(&stage).unwrap(), json);
    }

    #[test]
    fn test_serde_known_values() {
        let stage: PipelineStage = serde_json::from_str("\"distribution\"").unwrap();
        assert_eq!(stage, PipelineStage::Distribution);
        assert_eq!(serde_json::to_string(&stage).unwrap(), "\"distribution\"");
    }
}
