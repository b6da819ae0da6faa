use crate::error::{AppError, AppResult};
use crate::index::{IndexKind, VectorIndex};
use crate::knn;
use crate::store::chunk::Chunk;
use crate::store::position_index::PositionIndex;

/// Brute-force exact search: every query is ranked against the full matrix,
/// O(n·d) per search. Deterministic, and the baseline the approximate
/// strategies are judged against.
pub struct FlatL2Index {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    chunk_ids: PositionIndex,
    built: bool,
}

impl FlatL2Index {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            embeddings: Vec::new(),
            chunk_ids: PositionIndex::new(),
            built: false,
        }
    }
}

impl Default for FlatL2Index {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorIndex for FlatL2Index {
    fn kind(&self) -> IndexKind {
        IndexKind::FlatL2
    }

    fn add(&mut self, chunks: &[Chunk]) -> AppResult<()> {
        for chunk in chunks {
            let embedding = chunk.embedding.clone().ok_or_else(|| {
                AppError::Index(format!("chunk `{}` has no embedding", chunk.id))
            })?;
            self.chunks.push(chunk.clone());
            self.embeddings.push(embedding);
            self.chunk_ids.add(&chunk.id, self.chunks.len() - 1)?;
        }
        Ok(())
    }

    fn remove(&mut self, chunk_id: &str) -> AppResult<()> {
        let position = self.chunk_ids.position(chunk_id).ok_or_else(|| {
            AppError::NotFound(format!("Chunk with id `{}` is not indexed.", chunk_id))
        })?;
        self.chunks.remove(position);
        self.embeddings.remove(position);
        self.chunk_ids
            .remove(chunk_id, &self.chunks, |c| c.id.as_str())
    }

    fn update(
        &mut self,
        chunk_id: &str,
        text: &str,
        embedding: Option<Vec<f32>>,
    ) -> AppResult<()> {
        let position = self.chunk_ids.position(chunk_id).ok_or_else(|| {
            AppError::NotFound(format!("Chunk with id `{}` is not indexed.", chunk_id))
        })?;
        let chunk = &mut self.chunks[position];
        chunk.text = text.to_string();
        if let Some(vector) = embedding {
            self.embeddings[position] = vector.clone();
            chunk.embedding = Some(vector);
        }
        Ok(())
    }

    fn build(&mut self) -> AppResult<()> {
        // Search always ranks against the live matrix; build only arms it.
        self.built = true;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Chunk>> {
        if !self.built {
            return Err(AppError::Index(
                "flatl2 index has not been built; build the index before querying".to_string(),
            ));
        }
        let neighbors = knn::k_nearest(query, &self.embeddings, k);
        Ok(neighbors.into_iter().map(|i| self.chunks[i].clone()).collect())
    }

    fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::metadata::ChunkMetadata;
    use pretty_assertions::assert_eq;

    fn embedded(text: &str, vector: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(text, ChunkMetadata::new("doc-1"));
        chunk.embedding = Some(vector);
        chunk
    }

    #[test]
    fn search_before_build_fails() {
        let mut index = FlatL2Index::new();
        index.add(&[embedded("a", vec![0.0, 0.0])]).unwrap();
        assert!(matches!(
            index.search(&[0.0, 0.0], 1),
            Err(AppError::Index(_))
        ));
    }

    #[test]
    fn search_returns_exact_nearest_first() {
        let mut index = FlatL2Index::new();
        index
            .add(&[
                embedded("far", vec![10.0, 10.0]),
                embedded("near", vec![0.1, 0.1]),
                embedded("mid", vec![3.0, 3.0]),
            ])
            .unwrap();
        index.build().unwrap();

        let results = index.search(&[0.0, 0.0], 2).unwrap();
        let texts: Vec<&str> = results.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "mid"]);
    }

    #[test]
    fn oversized_k_returns_everything() {
        let mut index = FlatL2Index::new();
        index
            .add(&[embedded("a", vec![1.0]), embedded("b", vec![2.0])])
            .unwrap();
        index.build().unwrap();
        assert_eq!(index.search(&[0.0], 99).unwrap().len(), 2);
    }

    #[test]
    fn mutations_after_build_are_visible() {
        let mut index = FlatL2Index::new();
        index.add(&[embedded("a", vec![5.0])]).unwrap();
        index.build().unwrap();

        index.add(&[embedded("b", vec![0.5])]).unwrap();
        let results = index.search(&[0.0], 1).unwrap();
        assert_eq!(results[0].text, "b");
    }

    #[test]
    fn remove_then_search_excludes_chunk() {
        let mut index = FlatL2Index::new();
        let near = embedded("near", vec![0.0]);
        let near_id = near.id.clone();
        index.add(&[near, embedded("far", vec![9.0])]).unwrap();
        index.build().unwrap();

        index.remove(&near_id).unwrap();
        let results = index.search(&[0.0], 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "far");
    }

    #[test]
    fn update_moves_chunk_in_vector_space() {
        let mut index = FlatL2Index::new();
        let chunk = embedded("a", vec![9.0]);
        let id = chunk.id.clone();
        index.add(&[chunk, embedded("b", vec![1.0])]).unwrap();
        index.build().unwrap();

        index.update(&id, "a moved", Some(vec![0.0])).unwrap();
        let results = index.search(&[0.0], 1).unwrap();
        assert_eq!(results[0].text, "a moved");
    }
}
