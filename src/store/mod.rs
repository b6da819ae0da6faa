//! The hierarchical in-memory store: libraries hold documents, documents hold
//! chunks, and each library carries one vector search index kept in sync with
//! its documents.

pub mod chunk;
pub mod database;
pub mod document;
pub mod library;
pub mod metadata;
pub mod position_index;

pub use chunk::Chunk;
pub use database::Database;
pub use document::{Document, DocumentSummary};
pub use library::{Library, LibrarySummary};
pub use metadata::{ChunkMetadata, DocumentMetadata, LibraryMetadata};
