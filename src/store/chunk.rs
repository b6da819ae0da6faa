use crate::store::metadata::ChunkMetadata;
use serde::Serialize;
use uuid::Uuid;

/// The atomic searchable unit: a piece of text, an optional embedding, and
/// metadata naming the owning document.
///
/// The id is assigned at construction and never changes, not even when the
/// text is rewritten and the chunk re-embedded.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            embedding: None,
            metadata,
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.metadata.doc_id
    }
}
