//! Dense-vector search strategies behind one contract.
//!
//! Every strategy stores its own copy of the indexed chunks, keyed by chunk
//! id; the owning library keeps that copy synchronized with the documents on
//! each mutation. Chunks reach a strategy already embedded — embedding is
//! resolved upstream, outside the store lock.

mod flat;
mod ivf;
mod lsh;

pub use flat::FlatL2Index;
pub use ivf::IvfIndex;
pub use lsh::LshIndex;

use crate::error::AppResult;
use crate::store::chunk::Chunk;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    FlatL2,
    Ivf,
    Lsh,
}

pub trait VectorIndex: Send + Sync {
    fn kind(&self) -> IndexKind;

    /// Append already-embedded chunks to the index.
    fn add(&mut self, chunks: &[Chunk]) -> AppResult<()>;

    /// Drop a chunk from storage and secondary structures.
    fn remove(&mut self, chunk_id: &str) -> AppResult<()>;

    /// Replace a chunk's text and, when provided, its vector. Strategies with
    /// derived placement (LSH buckets) reassign the chunk accordingly.
    fn update(
        &mut self,
        chunk_id: &str,
        text: &str,
        embedding: Option<Vec<f32>>,
    ) -> AppResult<()>;

    /// Materialize whatever auxiliary structure the strategy needs. A no-op
    /// for incremental strategies.
    fn build(&mut self) -> AppResult<()>;

    /// Up to `k` chunks in ascending distance from the query vector.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Chunk>>;

    /// The currently-indexed chunks, in insertion order.
    fn chunks(&self) -> &[Chunk];
}

pub fn create_index(kind: IndexKind, dim: usize) -> Box<dyn VectorIndex> {
    match kind {
        IndexKind::FlatL2 => Box::new(FlatL2Index::new()),
        IndexKind::Ivf => Box::new(IvfIndex::new()),
        IndexKind::Lsh => Box::new(LshIndex::new(dim)),
    }
}
