use crate::error::{AppError, AppResult};
use crate::store::chunk::Chunk;
use crate::store::metadata::DocumentMetadata;
use crate::store::position_index::PositionIndex;
use serde::Serialize;
use uuid::Uuid;

/// Named, ordered collection of chunks within a library.
///
/// Invariant: for each chunk at position p, `chunk_ids` resolves its id to p.
pub struct Document {
    pub id: String,
    pub name: String,
    pub metadata: DocumentMetadata,
    chunks: Vec<Chunk>,
    chunk_ids: PositionIndex,
}

/// The JSON shape documents take on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub num_of_chunks: usize,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(name: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            metadata,
            chunks: Vec::new(),
            chunk_ids: PositionIndex::new(),
        }
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            num_of_chunks: self.chunks.len(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn get_chunk(&self, chunk_id: &str) -> AppResult<&Chunk> {
        let position = self.chunk_ids.position(chunk_id).ok_or_else(|| {
            AppError::NotFound(format!("Chunk with id `{}` does not exist.", chunk_id))
        })?;
        Ok(&self.chunks[position])
    }

    pub fn add_chunk(&mut self, chunk: Chunk) -> AppResult<()> {
        if self.chunk_ids.contains(&chunk.id) {
            return Err(AppError::Duplicate(format!(
                "Chunk with id `{}` already exists.",
                chunk.id
            )));
        }
        let id = chunk.id.clone();
        self.chunks.push(chunk);
        self.chunk_ids.add(&id, self.chunks.len() - 1)
    }

    /// Rewrite a chunk's text in place. The caller supplies the replacement
    /// embedding when the chunk was embedded before; the id never changes.
    pub fn update_chunk_text(
        &mut self,
        chunk_id: &str,
        text: &str,
        embedding: Option<Vec<f32>>,
    ) -> AppResult<&Chunk> {
        let position = self.chunk_ids.position(chunk_id).ok_or_else(|| {
            AppError::NotFound(format!("Chunk with id `{}` does not exist.", chunk_id))
        })?;
        let chunk = &mut self.chunks[position];
        chunk.text = text.to_string();
        if let Some(vector) = embedding {
            chunk.embedding = Some(vector);
        }
        Ok(&self.chunks[position])
    }

    /// Hand over every chunk, leaving the document empty. Used when a
    /// preloaded document enters a library and its chunks are re-registered
    /// through the library's insertion path.
    pub fn drain_chunks(&mut self) -> Vec<Chunk> {
        let chunks = std::mem::take(&mut self.chunks);
        self.chunk_ids.rebuild(&self.chunks, |c| c.id.as_str());
        chunks
    }

    pub fn remove_chunk(&mut self, chunk_id: &str) -> AppResult<Chunk> {
        let position = self.chunk_ids.position(chunk_id).ok_or_else(|| {
            AppError::NotFound(format!("Chunk with id `{}` does not exist.", chunk_id))
        })?;
        let removed = self.chunks.remove(position);
        self.chunk_ids
            .remove(chunk_id, &self.chunks, |c| c.id.as_str())?;
        Ok(removed)
    }
}
