use crate::error::{AppError, AppResult};
use crate::index::{IndexKind, VectorIndex, create_index};
use crate::store::chunk::Chunk;
use crate::store::document::Document;
use crate::store::metadata::LibraryMetadata;
use crate::store::position_index::PositionIndex;
use serde::Serialize;
use std::collections::HashMap;

/// Top-level container: documents plus one vector search index.
///
/// The library is the sole authority over cross-references. Documents and the
/// index store chunk values keyed by id, never pointers into each other, and
/// every mutation goes through here so both views observe the same change.
pub struct Library {
    pub name: String,
    pub metadata: LibraryMetadata,
    documents: Vec<Document>,
    doc_names: PositionIndex,
    doc_ids: PositionIndex,
    /// chunk id → owning document id, spanning every document.
    chunk_owner: HashMap<String, String>,
    index: Option<Box<dyn VectorIndex>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibrarySummary {
    pub name: String,
    pub metadata: LibraryMetadata,
}

impl Library {
    pub fn new(name: impl Into<String>, metadata: LibraryMetadata) -> Self {
        Self {
            name: name.into(),
            metadata,
            documents: Vec::new(),
            doc_names: PositionIndex::new(),
            doc_ids: PositionIndex::new(),
            chunk_owner: HashMap::new(),
            index: None,
        }
    }

    pub fn summary(&self) -> LibrarySummary {
        LibrarySummary {
            name: self.name.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Install the vector search strategy. Chosen once, at library creation.
    pub fn attach_index(&mut self, kind: IndexKind, dim: usize) {
        self.index = Some(create_index(kind, dim));
    }

    pub fn index_kind(&self) -> Option<IndexKind> {
        self.index.as_ref().map(|i| i.kind())
    }

    fn index_mut(&mut self) -> AppResult<&mut Box<dyn VectorIndex>> {
        let name = self.name.clone();
        self.index.as_mut().ok_or_else(|| {
            AppError::Index(format!("Library `{}` has no vector search index.", name))
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn add_document(&mut self, mut document: Document) -> AppResult<&Document> {
        if self.doc_names.contains(&document.name) {
            return Err(AppError::Duplicate(format!(
                "Document with name `{}` already exists.",
                document.name
            )));
        }

        // A preloaded document hands its chunks over so they are registered
        // through the normal insertion path (owner map + vector index).
        let pending: Vec<Chunk> = document.drain_chunks();

        self.doc_names.add(&document.name, self.documents.len())?;
        self.doc_ids.add(&document.id, self.documents.len())?;
        self.documents.push(document);

        if !pending.is_empty() {
            self.add_chunks(pending)?;
        }

        Ok(self.documents.last().expect("document was just pushed"))
    }

    /// Look up a document by name xor id.
    pub fn get_document(&self, name: Option<&str>, id: Option<&str>) -> AppResult<&Document> {
        let position = self.document_position(name, id)?;
        Ok(&self.documents[position])
    }

    fn document_position(&self, name: Option<&str>, id: Option<&str>) -> AppResult<usize> {
        match (name, id) {
            (Some(_), Some(_)) => Err(AppError::InvalidArgument(
                "Only one of `name` or `id` can be provided at a time.".to_string(),
            )),
            (None, None) => Err(AppError::InvalidArgument(
                "One of `name` or `id` must be provided.".to_string(),
            )),
            (Some(name), None) => self.doc_names.position(name).ok_or_else(|| {
                AppError::NotFound(format!("Document with name `{}` does not exist.", name))
            }),
            (None, Some(id)) => self.doc_ids.position(id).ok_or_else(|| {
                AppError::NotFound(format!("Document with id `{}` does not exist.", id))
            }),
        }
    }

    /// Remove a document and cascade removal of every chunk it holds, from
    /// both the owner map and the vector index.
    pub fn remove_document(&mut self, id: &str) -> AppResult<()> {
        let position = self.doc_ids.position(id).ok_or_else(|| {
            AppError::NotFound(format!("Document with id `{}` does not exist.", id))
        })?;

        let chunk_ids: Vec<String> = self.documents[position]
            .chunks()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        for chunk_id in &chunk_ids {
            self.remove_chunk(chunk_id)?;
        }

        self.documents.remove(position);
        self.doc_names.rebuild(&self.documents, |d| d.name.as_str());
        self.doc_ids.rebuild(&self.documents, |d| d.id.as_str());
        Ok(())
    }

    /// Atomic group insertion. Every chunk must carry an embedding and name
    /// an existing document in its metadata. On the first failure all chunks
    /// placed by this call are detached again and the original error is
    /// returned; only a fully-placed batch reaches the vector index.
    pub fn add_chunks(&mut self, chunks: Vec<Chunk>) -> AppResult<()> {
        if self.index.is_none() {
            return Err(AppError::Index(format!(
                "Library `{}` has no vector search index.",
                self.name
            )));
        }
        // Validated before any placement so a late failure cannot leave the
        // documents and the index disagreeing.
        for chunk in &chunks {
            if chunk.embedding.is_none() {
                return Err(AppError::Index(format!(
                    "chunk `{}` has no embedding",
                    chunk.id
                )));
            }
        }

        let mut placed: Vec<String> = Vec::with_capacity(chunks.len());

        for chunk in &chunks {
            let doc_position = match self.doc_ids.position(chunk.doc_id()) {
                Some(position) => position,
                None => {
                    let error = AppError::NotFound(format!(
                        "Document with id `{}` does not exist.",
                        chunk.doc_id()
                    ));
                    self.rollback_chunks(&placed);
                    return Err(error);
                }
            };

            if let Err(error) = self.documents[doc_position].add_chunk(chunk.clone()) {
                self.rollback_chunks(&placed);
                return Err(error);
            }

            self.chunk_owner
                .insert(chunk.id.clone(), chunk.doc_id().to_string());
            placed.push(chunk.id.clone());
        }

        self.index_mut()?.add(&chunks)
    }

    fn rollback_chunks(&mut self, placed: &[String]) {
        for chunk_id in placed {
            // Detach only: the batch never reached the vector index.
            if let Err(error) = self.detach_chunk(chunk_id) {
                tracing::warn!(%chunk_id, %error, "rollback failed to detach chunk");
            }
        }
    }

    /// Remove a chunk from its document and the owner map, without touching
    /// the vector index.
    fn detach_chunk(&mut self, chunk_id: &str) -> AppResult<Chunk> {
        let doc_id = self.chunk_owner.remove(chunk_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Chunk with id `{}` not found. There is no document associated with this chunk.",
                chunk_id
            ))
        })?;
        let position = self.doc_ids.position(&doc_id).ok_or_else(|| {
            AppError::NotFound(format!("Document with id `{}` does not exist.", doc_id))
        })?;
        self.documents[position].remove_chunk(chunk_id)
    }

    pub fn get_chunk(&self, chunk_id: &str) -> AppResult<&Chunk> {
        let doc_id = self.chunk_owner.get(chunk_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Chunk with id `{}` not found. There is no document associated with this chunk.",
                chunk_id
            ))
        })?;
        let position = self.doc_ids.position(doc_id).ok_or_else(|| {
            AppError::NotFound(format!("Document with id `{}` does not exist.", doc_id))
        })?;
        self.documents[position].get_chunk(chunk_id)
    }

    /// Every chunk in the library, by document traversal. Correct before any
    /// index build and after rollbacks, unlike the indexed view.
    pub fn get_chunks(&self) -> Vec<&Chunk> {
        self.documents.iter().flat_map(|d| d.chunks()).collect()
    }

    /// Rewrite a chunk's text, replacing the stored vector when the caller
    /// re-embedded it. Applied to the owning document and the vector index.
    pub fn update_chunk(
        &mut self,
        chunk_id: &str,
        text: &str,
        embedding: Option<Vec<f32>>,
    ) -> AppResult<()> {
        let doc_id = self.chunk_owner.get(chunk_id).cloned().ok_or_else(|| {
            AppError::NotFound(format!(
                "Chunk with id `{}` not found. There is no document associated with this chunk.",
                chunk_id
            ))
        })?;
        let position = self.doc_ids.position(&doc_id).ok_or_else(|| {
            AppError::NotFound(format!("Document with id `{}` does not exist.", doc_id))
        })?;

        self.documents[position].update_chunk_text(chunk_id, text, embedding.clone())?;
        self.index_mut()?.update(chunk_id, text, embedding)
    }

    pub fn remove_chunk(&mut self, chunk_id: &str) -> AppResult<()> {
        self.detach_chunk(chunk_id)?;
        self.index_mut()?.remove(chunk_id)
    }

    pub fn build_index(&mut self) -> AppResult<()> {
        self.index_mut()?.build()
    }

    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Chunk>> {
        let index = self.index.as_ref().ok_or_else(|| {
            AppError::Index(format!(
                "Library `{}` has no vector search index.",
                self.name
            ))
        })?;
        index.search(query, k)
    }

    /// The chunk → document mapping, exposed for invariant checks.
    #[cfg(test)]
    pub fn chunk_owner_map(&self) -> &HashMap<String, String> {
        &self.chunk_owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::metadata::{ChunkMetadata, DocumentMetadata};
    use pretty_assertions::assert_eq;

    fn library() -> Library {
        let mut lib = Library::new("lib", LibraryMetadata::default());
        lib.attach_index(IndexKind::FlatL2, 2);
        lib
    }

    fn document(lib: &mut Library, name: &str) -> String {
        let doc = Document::new(name, DocumentMetadata::default());
        let id = doc.id.clone();
        lib.add_document(doc).unwrap();
        id
    }

    fn embedded(text: &str, doc_id: &str, vector: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(text, ChunkMetadata::new(doc_id));
        chunk.embedding = Some(vector);
        chunk
    }

    #[test]
    fn duplicate_document_name_rejected() {
        let mut lib = library();
        document(&mut lib, "d");
        let dup = Document::new("d", DocumentMetadata::default());
        assert!(matches!(lib.add_document(dup), Err(AppError::Duplicate(_))));
        assert_eq!(lib.documents().len(), 1);
    }

    #[test]
    fn get_document_requires_exactly_one_key() {
        let mut lib = library();
        let id = document(&mut lib, "d");

        assert!(matches!(
            lib.get_document(Some("d"), Some(&id)),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            lib.get_document(None, None),
            Err(AppError::InvalidArgument(_))
        ));
        assert_eq!(lib.get_document(Some("d"), None).unwrap().id, id);
        assert_eq!(lib.get_document(None, Some(&id)).unwrap().name, "d");
    }

    #[test]
    fn get_document_unknown_name_is_not_found() {
        let mut lib = library();
        document(&mut lib, "d");
        assert!(matches!(
            lib.get_document(Some("other"), None),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn add_chunks_updates_owner_map_and_index() {
        let mut lib = library();
        let doc_id = document(&mut lib, "d");
        let chunk = embedded("hello", &doc_id, vec![1.0, 0.0]);
        let chunk_id = chunk.id.clone();

        lib.add_chunks(vec![chunk]).unwrap();

        assert_eq!(lib.chunk_owner_map().get(&chunk_id), Some(&doc_id));
        assert_eq!(lib.get_chunk(&chunk_id).unwrap().text, "hello");
        lib.build_index().unwrap();
        let hits = lib.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].id, chunk_id);
    }

    #[test]
    fn add_chunks_rolls_back_on_unknown_document() {
        let mut lib = library();
        let doc_id = document(&mut lib, "d");

        let first = embedded("one", &doc_id, vec![1.0, 0.0]);
        let second = embedded("two", "no-such-doc", vec![0.0, 1.0]);
        let third = embedded("three", &doc_id, vec![1.0, 1.0]);
        let first_id = first.id.clone();

        let result = lib.add_chunks(vec![first, second, third]);
        assert!(matches!(result, Err(AppError::NotFound(_))));

        // Nothing from the batch is reachable and the counts are unchanged.
        assert!(lib.get_chunk(&first_id).is_err());
        assert_eq!(lib.get_document(None, Some(&doc_id)).unwrap().chunk_count(), 0);
        assert!(lib.chunk_owner_map().is_empty());
        assert_eq!(lib.get_chunks().len(), 0);
    }

    #[test]
    fn add_chunks_rolls_back_on_duplicate_chunk() {
        let mut lib = library();
        let doc_id = document(&mut lib, "d");

        let chunk = embedded("one", &doc_id, vec![1.0, 0.0]);
        let duplicate = chunk.clone();
        let result = lib.add_chunks(vec![chunk, duplicate]);
        assert!(matches!(result, Err(AppError::Duplicate(_))));
        assert_eq!(lib.get_document(None, Some(&doc_id)).unwrap().chunk_count(), 0);
        assert!(lib.chunk_owner_map().is_empty());
    }

    #[test]
    fn remove_document_cascades_chunks() {
        let mut lib = library();
        let keep_id = document(&mut lib, "keep");
        let drop_id = document(&mut lib, "drop");

        let kept = embedded("kept", &keep_id, vec![0.0, 1.0]);
        let dropped = embedded("dropped", &drop_id, vec![1.0, 0.0]);
        let kept_id = kept.id.clone();
        let dropped_id = dropped.id.clone();
        lib.add_chunks(vec![kept, dropped]).unwrap();

        lib.remove_document(&drop_id).unwrap();

        assert!(lib.get_chunk(&dropped_id).is_err());
        assert!(lib.get_document(None, Some(&drop_id)).is_err());
        assert_eq!(lib.get_chunk(&kept_id).unwrap().text, "kept");
        // The surviving document's position index was rebuilt.
        assert_eq!(lib.get_document(Some("keep"), None).unwrap().id, keep_id);

        lib.build_index().unwrap();
        let hits = lib.search(&[1.0, 0.0], 5).unwrap();
        assert!(hits.iter().all(|c| c.id != dropped_id));
    }

    #[test]
    fn remove_unknown_document_is_not_found() {
        let mut lib = library();
        assert!(matches!(
            lib.remove_document("missing"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn update_chunk_reaches_document_and_index() {
        let mut lib = library();
        let doc_id = document(&mut lib, "d");
        let chunk = embedded("before", &doc_id, vec![5.0, 5.0]);
        let chunk_id = chunk.id.clone();
        lib.add_chunks(vec![chunk]).unwrap();
        lib.build_index().unwrap();

        lib.update_chunk(&chunk_id, "after", Some(vec![0.0, 0.0]))
            .unwrap();

        assert_eq!(lib.get_chunk(&chunk_id).unwrap().text, "after");
        let hits = lib.search(&[0.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].text, "after");
    }

    #[test]
    fn remove_chunk_reaches_document_and_index() {
        let mut lib = library();
        let doc_id = document(&mut lib, "d");
        let chunk = embedded("gone", &doc_id, vec![1.0, 1.0]);
        let chunk_id = chunk.id.clone();
        lib.add_chunks(vec![chunk]).unwrap();
        lib.build_index().unwrap();

        lib.remove_chunk(&chunk_id).unwrap();

        assert!(matches!(
            lib.get_chunk(&chunk_id),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(lib.search(&[1.0, 1.0], 5).unwrap().len(), 0);
        assert!(matches!(
            lib.remove_chunk(&chunk_id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn preloaded_document_routes_chunks_through_insertion() {
        let mut lib = library();
        let mut doc = Document::new("d", DocumentMetadata::default());
        let doc_id = doc.id.clone();
        let chunk = embedded("preloaded", &doc_id, vec![1.0, 2.0]);
        let chunk_id = chunk.id.clone();
        doc.add_chunk(chunk).unwrap();

        lib.add_document(doc).unwrap();

        assert_eq!(lib.chunk_owner_map().get(&chunk_id), Some(&doc_id));
        assert_eq!(lib.get_chunk(&chunk_id).unwrap().text, "preloaded");
        lib.build_index().unwrap();
        assert_eq!(lib.search(&[1.0, 2.0], 1).unwrap()[0].id, chunk_id);
    }

    #[test]
    fn search_without_index_is_an_internal_error() {
        let lib = Library::new("bare", LibraryMetadata::default());
        assert!(matches!(
            lib.search(&[0.0], 1),
            Err(AppError::Index(_))
        ));
    }
}
