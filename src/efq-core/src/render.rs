//! Rendering contract and the JSON renderer of the in-memory store

use efq_query::{EntityId, MemoryStore};
use serde::Serialize;
use serde_json::Value;

/// Rendered records, ready for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedOutput {
    /// Entity kind of the records
    pub entity_kind: String,
    /// View mode the records were rendered in
    pub view_mode: String,
    /// One item per record, in query order
    pub items: Vec<Value>,
}

/// Failures while rendering records
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// An id returned by the query could not be loaded
    #[error("Entity {0} not found")]
    Missing(EntityId),

    /// The renderer failed for another reason
    #[error("Render failed: {0}")]
    Failed(String),
}

/// Loads and renders records by id
pub trait Renderer {
    /// Render `ids` in `view_mode`; `None` when there is nothing to render
    fn render(
        &self,
        ids: &[EntityId],
        view_mode: &str,
        entity_kind: &str,
    ) -> Result<Option<RenderedOutput>, RenderError>;
}

impl<T: Renderer + ?Sized> Renderer for &T {
    fn render(
        &self,
        ids: &[EntityId],
        view_mode: &str,
        entity_kind: &str,
    ) -> Result<Option<RenderedOutput>, RenderError> {
        (**self).render(ids, view_mode, entity_kind)
    }
}

impl Renderer for MemoryStore {
    fn render(
        &self,
        ids: &[EntityId],
        view_mode: &str,
        entity_kind: &str,
    ) -> Result<Option<RenderedOutput>, RenderError> {
        if ids.is_empty() {
            return Ok(None);
        }
        let items = ids
            .iter()
            .map(|&id| self.get(id).cloned().ok_or(RenderError::Missing(id)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(RenderedOutput {
            entity_kind: entity_kind.to_string(),
            view_mode: view_mode.to_string(),
            items,
        }))
    }
}
