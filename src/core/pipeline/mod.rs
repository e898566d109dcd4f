//! Delivery pipeline: stage vocabulary, project records and the stage
//! gate that enforces approval before distribution.

pub mod gate;
pub mod project;
pub mod stages;

pub use gate::{GateError, GateResult, PipelineStageGate, PipelineStatus};
pub use project::ProjectRecord;
pub use stages::PipelineStage;
