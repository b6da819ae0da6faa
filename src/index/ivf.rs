use crate::error::{AppError, AppResult};
use crate::index::{IndexKind, VectorIndex};
use crate::knn;
use crate::store::chunk::Chunk;
use crate::store::position_index::PositionIndex;
use rand::Rng;
use tracing::debug;

pub const DEFAULT_CLUSTERS: usize = 2;
pub const DEFAULT_ITERATIONS: usize = 100;

/// Sample k initial centers, each coordinate uniform within the per-dimension
/// bounds of the embedding set.
fn init_centers(embeddings: &[Vec<f32>], k: usize, rng: &mut impl Rng) -> Vec<Vec<f32>> {
    let dim = embeddings[0].len();
    let mut mins = vec![f32::INFINITY; dim];
    let mut maxs = vec![f32::NEG_INFINITY; dim];
    for embedding in embeddings {
        for (d, &value) in embedding.iter().enumerate() {
            mins[d] = mins[d].min(value);
            maxs[d] = maxs[d].max(value);
        }
    }

    (0..k)
        .map(|_| (0..dim).map(|d| rng.gen_range(mins[d]..=maxs[d])).collect())
        .collect()
}

/// Assign every embedding to its nearest center. Ties break toward the lower
/// cluster index.
fn assign_clusters(embeddings: &[Vec<f32>], centers: &[Vec<f32>]) -> Vec<usize> {
    embeddings
        .iter()
        .map(|embedding| {
            let mut best = 0;
            let mut best_dist = f32::INFINITY;
            for (i, center) in centers.iter().enumerate() {
                let dist = knn::squared_l2(embedding, center);
                if dist < best_dist {
                    best = i;
                    best_dist = dist;
                }
            }
            best
        })
        .collect()
}

/// Recompute each center as the mean of its assignees; a cluster with no
/// assignees keeps its previous center.
fn update_centers(
    embeddings: &[Vec<f32>],
    assignments: &[usize],
    previous: &[Vec<f32>],
) -> Vec<Vec<f32>> {
    let dim = embeddings[0].len();
    let k = previous.len();
    let mut sums = vec![vec![0.0f32; dim]; k];
    let mut counts = vec![0usize; k];

    for (embedding, &cluster) in embeddings.iter().zip(assignments.iter()) {
        counts[cluster] += 1;
        for (d, &value) in embedding.iter().enumerate() {
            sums[cluster][d] += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous.iter())
        .map(|((sum, count), prev)| {
            if count == 0 {
                prev.clone()
            } else {
                sum.into_iter().map(|v| v / count as f32).collect()
            }
        })
        .collect()
}

/// Lloyd's algorithm with uniform bounding-box initialization. Returns the
/// final centers and the per-embedding assignment.
fn kmeans(embeddings: &[Vec<f32>], k: usize, n_iter: usize) -> (Vec<Vec<f32>>, Vec<usize>) {
    let mut rng = rand::thread_rng();
    let mut centers = init_centers(embeddings, k, &mut rng);
    let mut assignments = Vec::new();

    for _ in 0..n_iter {
        assignments = assign_clusters(embeddings, &centers);
        centers = update_centers(embeddings, &assignments, &centers);
    }

    (centers, assignments)
}

struct ClusterEntry {
    embedding: Vec<f32>,
    chunk: Chunk,
}

/// Inverted-file index: k-means partitions the embedding space at build time,
/// and every search probes only the cluster whose center is nearest to the
/// query. Approximate by construction.
///
/// Mutations between builds touch only the raw chunk/embedding lists; the
/// clustering stays as of the last build, so searches reflect that snapshot
/// until `build` runs again.
pub struct IvfIndex {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    chunk_ids: PositionIndex,
    n_clusters: usize,
    n_iter: usize,
    centers: Vec<Vec<f32>>,
    clusters: Vec<Vec<ClusterEntry>>,
    built: bool,
}

impl IvfIndex {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_CLUSTERS, DEFAULT_ITERATIONS)
    }

    pub fn with_params(n_clusters: usize, n_iter: usize) -> Self {
        Self {
            chunks: Vec::new(),
            embeddings: Vec::new(),
            chunk_ids: PositionIndex::new(),
            n_clusters,
            n_iter,
            centers: Vec::new(),
            clusters: Vec::new(),
            built: false,
        }
    }
}

impl Default for IvfIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorIndex for IvfIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Ivf
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
        self.centers.clear();
        self.clusters.clear();

        if !self.embeddings.is_empty() {
            let (centers, assignments) = kmeans(&self.embeddings, self.n_clusters, self.n_iter);
            self.clusters = (0..centers.len()).map(|_| Vec::new()).collect();
            for (position, &cluster) in assignments.iter().enumerate() {
                self.clusters[cluster].push(ClusterEntry {
                    embedding: self.embeddings[position].clone(),
                    chunk: self.chunks[position].clone(),
                });
            }
            self.centers = centers;
        }

        debug!(
            clusters = self.centers.len(),
            chunks = self.chunks.len(),
            "ivf clustering rebuilt"
        );
        self.built = true;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Chunk>> {
        if !self.built {
            return Err(AppError::Index(
                "ivf index has not been built; build the index before querying".to_string(),
            ));
        }
        if self.centers.is_empty() {
            return Ok(Vec::new());
        }

        let mut nearest = 0;
        let mut nearest_dist = f32::INFINITY;
        for (i, center) in self.centers.iter().enumerate() {
            let dist = knn::squared_l2(query, center);
            if dist < nearest_dist {
                nearest = i;
                nearest_dist = dist;
            }
        }

        let members = &self.clusters[nearest];
        let matrix: Vec<Vec<f32>> = members.iter().map(|m| m.embedding.clone()).collect();
        let neighbors = knn::k_nearest(query, &matrix, k);
        Ok(neighbors
            .into_iter()
            .map(|i| members[i].chunk.clone())
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
    fn search_before_build_fails() {
        let mut index = IvfIndex::new();
        index.add(&[embedded("a", vec![0.0])]).unwrap();
        assert!(matches!(
            index.search(&[0.0], 1),
            Err(AppError::Index(_))
        ));
    }

    #[test]
    fn build_on_empty_index_searches_empty() {
        let mut index = IvfIndex::new();
        index.build().unwrap();
        assert_eq!(index.search(&[0.0], 3).unwrap().len(), 0);
    }

    #[test]
    fn search_probes_the_nearest_cluster() {
        // Two tight, well-separated groups. Whatever partition k-means lands
        // on, the nearest chunk to a query placed inside a group is always in
        // the probed cluster.
        let mut index = IvfIndex::new();
        index
            .add(&[
                embedded("left-1", vec![0.0, 0.1]),
                embedded("left-2", vec![0.1, 0.0]),
                embedded("right-1", vec![10.0, 10.1]),
                embedded("right-2", vec![10.1, 10.0]),
            ])
            .unwrap();
        index.build().unwrap();

        let results = index.search(&[0.05, 0.05], 1).unwrap();
        assert!(results[0].text.starts_with("left"));

        let results = index.search(&[10.05, 10.05], 1).unwrap();
        assert!(results[0].text.starts_with("right"));
    }

    #[test]
    fn mutations_between_builds_do_not_move_clusters() {
        let mut index = IvfIndex::new();
        let stale = embedded("stale", vec![0.0, 0.0]);
        let stale_id = stale.id.clone();
        index.add(&[stale, embedded("kept", vec![0.2, 0.2])]).unwrap();
        index.build().unwrap();

        // Removed from raw storage, still present in the built clustering.
        index.remove(&stale_id).unwrap();
        let results = index.search(&[0.0, 0.0], 5).unwrap();
        assert!(results.iter().any(|c| c.id == stale_id));

        index.build().unwrap();
        let results = index.search(&[0.0, 0.0], 5).unwrap();
        assert!(results.iter().all(|c| c.id != stale_id));
    }

    #[test]
    fn kmeans_empty_cluster_keeps_previous_center() {
        let embeddings = vec![vec![1.0, 1.0], vec![1.1, 0.9]];
        let previous = vec![vec![1.0, 1.0], vec![50.0, 50.0]];
        let assignments = vec![0, 0];
        let updated = update_centers(&embeddings, &assignments, &previous);
        assert_eq!(updated[1], vec![50.0, 50.0]);
    }

    #[test]
    fn assignment_ties_break_to_lower_cluster() {
        let centers = vec![vec![1.0], vec![-1.0]];
        let assignments = assign_clusters(&[vec![0.0]], &centers);
        assert_eq!(assignments, vec![0]);
    }
}
