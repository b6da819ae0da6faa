use crate::embed::{EmbedInput, Embedder};
use crate::error::AppResult;
use crate::index::IndexKind;
use crate::store::{
    Chunk, Database, Document, DocumentMetadata, DocumentSummary, Library, LibraryMetadata,
    LibrarySummary,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Single entry point for every database operation.
///
/// Holds the writer-exclusive lock over the store and the shared embedding
/// client. The lock is never held across an await: operations that need the
/// remote provider embed first, then take the lock and install the result
/// locally. Existence is re-validated under the write lock, so a concurrent
/// removal between the two steps surfaces as NotFound rather than a partial
/// write.
pub struct DatabaseManager {
    db: RwLock<Database>,
    embedder: Arc<dyn Embedder>,
}

impl DatabaseManager {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            db: RwLock::new(Database::new()),
            embedder,
        }
    }

    // ---- libraries ----

    pub fn list_libraries(&self) -> Vec<LibrarySummary> {
        self.db.read().libraries().iter().map(|l| l.summary()).collect()
    }

    pub fn get_library(&self, name: &str) -> AppResult<LibrarySummary> {
        Ok(self.db.read().get_library(name)?.summary())
    }

    pub fn create_library(
        &self,
        name: String,
        metadata: LibraryMetadata,
        kind: IndexKind,
    ) -> AppResult<()> {
        let mut library = Library::new(name.clone(), metadata);
        library.attach_index(kind, self.embedder.dimension());
        self.db.write().add_library(library)?;
        info!(library = %name, index = ?kind, "library created");
        Ok(())
    }

    pub fn rename_library(&self, previous: &str, new: &str) -> AppResult<()> {
        self.db.write().update_library_name(previous, new)?;
        info!(from = previous, to = new, "library renamed");
        Ok(())
    }

    pub fn remove_library(&self, name: &str) -> AppResult<()> {
        self.db.write().remove_library(name)?;
        info!(library = name, "library removed");
        Ok(())
    }

    // ---- documents ----

    pub fn list_documents(&self, library: &str) -> AppResult<Vec<DocumentSummary>> {
        let db = self.db.read();
        Ok(db
            .get_library(library)?
            .documents()
            .iter()
            .map(|d| d.summary())
            .collect())
    }

    pub fn get_document(&self, library: &str, doc_id: &str) -> AppResult<DocumentSummary> {
        let db = self.db.read();
        Ok(db
            .get_library(library)?
            .get_document(None, Some(doc_id))?
            .summary())
    }

    pub fn create_document(
        &self,
        library: &str,
        name: String,
        metadata: DocumentMetadata,
    ) -> AppResult<DocumentSummary> {
        let mut db = self.db.write();
        let document = Document::new(name, metadata);
        let summary = db.get_library_mut(library)?.add_document(document)?.summary();
        info!(library, document = %summary.name, "document created");
        Ok(summary)
    }

    pub fn remove_document(&self, library: &str, doc_id: &str) -> AppResult<()> {
        self.db.write().get_library_mut(library)?.remove_document(doc_id)?;
        info!(library, doc_id, "document removed");
        Ok(())
    }

    // ---- chunks ----

    pub fn list_chunks(&self, library: &str, doc_id: Option<&str>) -> AppResult<Vec<Chunk>> {
        let db = self.db.read();
        let lib = db.get_library(library)?;
        let chunks = match doc_id {
            Some(id) => lib.get_document(None, Some(id))?.chunks().to_vec(),
            None => lib.get_chunks().into_iter().cloned().collect(),
        };
        Ok(chunks)
    }

    pub fn get_chunk(&self, library: &str, chunk_id: &str) -> AppResult<Chunk> {
        Ok(self.db.read().get_library(library)?.get_chunk(chunk_id)?.clone())
    }

    /// Atomic group insertion. The whole batch is embedded before the write
    /// lock is taken; a provider failure commits nothing.
    pub async fn add_chunks(&self, library: &str, mut chunks: Vec<Chunk>) -> AppResult<()> {
        // Fail fast on an unknown library before paying for embeddings.
        self.db.read().get_library(library)?;

        let missing: Vec<usize> = chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.embedding.is_none())
            .map(|(i, _)| i)
            .collect();
        if !missing.is_empty() {
            let texts: Vec<String> = missing.iter().map(|&i| chunks[i].text.clone()).collect();
            let vectors = self.embedder.embed(&texts, EmbedInput::Document).await?;
            for (&i, vector) in missing.iter().zip(vectors) {
                chunks[i].embedding = Some(vector);
            }
        }

        let count = chunks.len();
        self.db.write().get_library_mut(library)?.add_chunks(chunks)?;
        info!(library, count, "chunks added");
        Ok(())
    }

    /// Rewrite a chunk's text, re-embedding when the chunk was embedded
    /// before. The chunk id never changes.
    pub async fn update_chunk(&self, library: &str, chunk_id: &str, text: &str) -> AppResult<()> {
        let had_embedding = {
            let db = self.db.read();
            db.get_library(library)?.get_chunk(chunk_id)?.embedding.is_some()
        };

        let embedding = if had_embedding {
            let vectors = self
                .embedder
                .embed(&[text.to_string()], EmbedInput::Document)
                .await?;
            vectors.into_iter().next()
        } else {
            None
        };

        self.db
            .write()
            .get_library_mut(library)?
            .update_chunk(chunk_id, text, embedding)?;
        info!(library, chunk_id, "chunk updated");
        Ok(())
    }

    pub fn remove_chunk(&self, library: &str, chunk_id: &str) -> AppResult<()> {
        self.db.write().get_library_mut(library)?.remove_chunk(chunk_id)?;
        info!(library, chunk_id, "chunk removed");
        Ok(())
    }

    // ---- search ----

    pub fn build_index(&self, library: &str) -> AppResult<()> {
        let started = Instant::now();
        self.db.write().get_library_mut(library)?.build_index()?;
        info!(
            library,
            duration_ms = started.elapsed().as_millis() as u64,
            "index built"
        );
        Ok(())
    }

    pub async fn search(&self, library: &str, query: &str, k: usize) -> AppResult<Vec<Chunk>> {
        self.db.read().get_library(library)?;

        let vectors = self
            .embedder
            .embed(&[query.to_string()], EmbedInput::Query)
            .await?;
        let query_vector = vectors.into_iter().next().unwrap_or_default();

        self.db.read().get_library(library)?.search(&query_vector, k)
    }
}
