use crate::error::{AppError, AppResult};
use crate::index::{IndexKind, VectorIndex};
use crate::knn;
use crate::store::chunk::Chunk;
use crate::store::position_index::PositionIndex;
use rand::Rng;
use std::collections::HashMap;

pub const DEFAULT_PLANES: usize = 20;

/// Buckets probed when the query's own bucket is empty.
const N_PROBE: usize = 2;

/// Standard-normal sample via Box-Muller.
fn sample_gaussian(rng: &mut impl Rng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

fn hamming_distance(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count()
}

/// Locality-sensitive hashing with random hyperplanes.
///
/// Each vector hashes to a bit string: one bit per hyperplane, set when the
/// dot product is positive. Nearby vectors tend to share buckets, so a search
/// ranks only one bucket's members (or the two nearest buckets by Hamming
/// distance when the query's bucket is empty). Fully incremental: `build` is
/// a no-op.
pub struct LshIndex {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    chunk_ids: PositionIndex,
    /// Fixed for the life of the index.
    hyperplanes: Vec<Vec<f32>>,
    /// hash → chunk ids, in insertion order within each bucket.
    buckets: HashMap<String, Vec<String>>,
    /// Bucket keys in creation order; Hamming ties resolve by this order.
    bucket_order: Vec<String>,
}

impl LshIndex {
    pub fn new(dim: usize) -> Self {
        Self::with_planes(DEFAULT_PLANES, dim)
    }

    pub fn with_planes(n_planes: usize, dim: usize) -> Self {
        let mut rng = rand::thread_rng();
        let hyperplanes = (0..n_planes)
            .map(|_| (0..dim).map(|_| sample_gaussian(&mut rng)).collect())
            .collect();
        Self {
            chunks: Vec::new(),
            embeddings: Vec::new(),
            chunk_ids: PositionIndex::new(),
            hyperplanes,
            buckets: HashMap::new(),
            bucket_order: Vec::new(),
        }
    }

    pub fn hash(&self, vector: &[f32]) -> String {
        self.hyperplanes
            .iter()
            .map(|plane| {
                let dot: f32 = vector.iter().zip(plane.iter()).map(|(v, p)| v * p).sum();
                if dot > 0.0 { '1' } else { '0' }
            })
            .collect()
    }

    fn insert_into_bucket(&mut self, key: String, chunk_id: String) {
        if !self.buckets.contains_key(&key) {
            self.bucket_order.push(key.clone());
        }
        self.buckets.entry(key).or_default().push(chunk_id);
    }

    fn remove_from_bucket(&mut self, key: &str, chunk_id: &str) {
        if let Some(bucket) = self.buckets.get_mut(key) {
            bucket.retain(|id| id != chunk_id);
        }
    }

    /// Candidate chunk ids for a query hash: the query's own bucket when it
    /// has members, otherwise the union of the `N_PROBE` buckets nearest in
    /// Hamming distance.
    fn candidates(&self, key: &str) -> Vec<String> {
        if let Some(bucket) = self.buckets.get(key) {
            if !bucket.is_empty() {
                return bucket.clone();
            }
        }

        let mut ranked: Vec<&String> = self.bucket_order.iter().collect();
        ranked.sort_by_key(|bucket_key| hamming_distance(key, bucket_key.as_str()));
        ranked
            .into_iter()
            .take(N_PROBE)
            .flat_map(|bucket_key| self.buckets[bucket_key].iter().cloned())
            .collect()
    }
}

impl VectorIndex for LshIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Lsh
    }

    fn add(&mut self, chunks: &[Chunk]) -> AppResult<()> {
        for chunk in chunks {
            let embedding = chunk.embedding.clone().ok_or_else(|| {
                AppError::Index(format!("chunk `{}` has no embedding", chunk.id))
            })?;
            let key = self.hash(&embedding);
            self.chunks.push(chunk.clone());
            self.embeddings.push(embedding);
            self.chunk_ids.add(&chunk.id, self.chunks.len() - 1)?;
            self.insert_into_bucket(key, chunk.id.clone());
        }
        Ok(())
    }

    fn remove(&mut self, chunk_id: &str) -> AppResult<()> {
        let position = self.chunk_ids.position(chunk_id).ok_or_else(|| {
            AppError::NotFound(format!("Chunk with id `{}` is not indexed.", chunk_id))
        })?;
        let key = self.hash(&self.embeddings[position]);
        self.remove_from_bucket(&key, chunk_id);
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

        self.chunks[position].text = text.to_string();
        if let Some(vector) = embedding {
            let old_key = self.hash(&self.embeddings[position]);
            let new_key = self.hash(&vector);
            if old_key != new_key {
                self.remove_from_bucket(&old_key, chunk_id);
                self.insert_into_bucket(new_key, chunk_id.to_string());
            }
            self.embeddings[position] = vector.clone();
            self.chunks[position].embedding = Some(vector);
        }
        Ok(())
    }

    fn build(&mut self) -> AppResult<()> {
        // Bucket state is maintained incrementally on every mutation.
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Chunk>> {
        let key = self.hash(query);
        let candidate_ids = self.candidates(&key);

        let mut positions = Vec::with_capacity(candidate_ids.len());
        let mut matrix = Vec::with_capacity(candidate_ids.len());
        for id in &candidate_ids {
            let position = self.chunk_ids.position(id).ok_or_else(|| {
                AppError::Index(format!("bucket references unknown chunk `{}`", id))
            })?;
            positions.push(position);
            matrix.push(self.embeddings[position].clone());
        }

        let neighbors = knn::k_nearest(query, &matrix, k);
        Ok(neighbors
            .into_iter()
            .map(|i| self.chunks[positions[i]].clone())
            .collect())
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
    fn hashing_is_idempotent() {
        let index = LshIndex::new(8);
        let vector: Vec<f32> = (0..8).map(|i| (i as f32 * 0.7).sin()).collect();
        let first = index.hash(&vector);
        for _ in 0..10 {
            assert_eq!(index.hash(&vector), first);
        }
        assert_eq!(first.len(), DEFAULT_PLANES);
    }

    #[test]
    fn identical_vectors_share_a_bucket() {
        let mut index = LshIndex::new(4);
        index
            .add(&[
                embedded("a", vec![1.0, 2.0, 3.0, 4.0]),
                embedded("b", vec![1.0, 2.0, 3.0, 4.0]),
            ])
            .unwrap();

        let results = index.search(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn search_without_build_succeeds() {
        let mut index = LshIndex::new(4);
        index.add(&[embedded("a", vec![0.5, 0.5, 0.5, 0.5])]).unwrap();
        let results = index.search(&[0.5, 0.5, 0.5, 0.5], 1).unwrap();
        assert_eq!(results[0].text, "a");
    }

    #[test]
    fn empty_index_returns_empty() {
        let index = LshIndex::new(4);
        assert_eq!(index.search(&[0.0, 0.0, 0.0, 0.0], 3).unwrap().len(), 0);
    }

    #[test]
    fn probing_falls_back_to_nearest_buckets() {
        let mut index = LshIndex::new(4);
        index
            .add(&[
                embedded("a", vec![1.0, 1.0, 1.0, 1.0]),
                embedded("b", vec![-1.0, -1.0, -1.0, -1.0]),
            ])
            .unwrap();

        // Whatever bucket the query hashes into, probing guarantees a
        // non-empty candidate set as long as the index holds chunks.
        let results = index.search(&[0.3, -0.2, 0.9, -0.7], 2).unwrap();
        assert!(!results.is_empty());
    }

    #[test]
    fn remove_takes_chunk_out_of_its_bucket() {
        let mut index = LshIndex::new(4);
        let gone = embedded("gone", vec![1.0, 1.0, 1.0, 1.0]);
        let gone_id = gone.id.clone();
        index
            .add(&[gone, embedded("kept", vec![1.0, 1.0, 1.0, 0.9])])
            .unwrap();

        index.remove(&gone_id).unwrap();
        let results = index.search(&[1.0, 1.0, 1.0, 1.0], 5).unwrap();
        assert!(results.iter().all(|c| c.id != gone_id));
        assert_eq!(index.chunks().len(), 1);
    }

    #[test]
    fn update_reassigns_bucket_when_vector_moves() {
        let mut index = LshIndex::new(4);
        let chunk = embedded("mover", vec![1.0, 1.0, 1.0, 1.0]);
        let id = chunk.id.clone();
        index.add(&[chunk]).unwrap();

        index
            .update(&id, "moved", Some(vec![-1.0, -1.0, -1.0, -1.0]))
            .unwrap();

        let results = index.search(&[-1.0, -1.0, -1.0, -1.0], 1).unwrap();
        assert_eq!(results[0].text, "moved");
        assert_eq!(results[0].id, id);
    }
}
