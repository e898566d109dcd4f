//! Document rendering seam.
//!
//! Version creation hands campaign content to a [`DocumentRenderer`] and
//! only allocates a version number once rendering succeeded, so a failed
//! render never consumes a number.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::documents::ContentSnapshot;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render failed: {0}")]
    Failed(String),
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

impl RenderError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Input to a render: the frozen content plus identifiers the renderer
/// may embed in the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub campaign_id: String,
    pub organization_id: String,
    pub snapshot: ContentSnapshot,
}

/// A finished artifact, hosted at a stable URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub download_url: String,
    pub file_size_bytes: u64,
}

/// Turns campaign content into a hosted document.
pub trait DocumentRenderer: Send + Sync {
    fn render(
        &self,
        request: &RenderRequest,
    ) -> impl std::future::Future<Output = Result<RenderedDocument, RenderError>> + Send;
}

/// Development renderer: fabricates a deterministic URL without touching
/// any external service.
#[derive(Debug, Default)]
pub struct LocalRenderer;

impl DocumentRenderer for LocalRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedDocument, RenderError> {
        let file_size_bytes =
            (request.snapshot.main_content.len() as u64).max(1) * 2 + 10_240;
        Ok(RenderedDocument {
            download_url: format!(
                "local://documents/{}/{}.pdf",
                request.organization_id, request.campaign_id
            ),
            file_size_bytes,
        })
    }
}
