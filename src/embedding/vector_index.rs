/// HNSW vector index for similarity search
use hnsw_rs::prelude::*;
use thiserror::Error;

/// Upper bound on HNSW layers
const MAX_LAYER: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}

/// Search result with ID and similarity score
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Position of the document in the owning store
    pub id: usize,
    /// Cosine similarity score (higher is more similar)
    pub score: f32,
}

/// HNSW vector index wrapper
///
/// Approximate nearest neighbor search with cosine distance. The index is
/// built once and then only read, so it can be shared across tasks.
pub struct VectorIndex {
    index: Hnsw<'static, f32, DistCosine>,
    dimension: usize,
    count: usize,
}

impl VectorIndex {
    /// Create a new vector index
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match embedding dimension)
    /// * `capacity` - Expected number of vectors
    /// * `m` - HNSW M parameter (number of connections per layer)
    /// * `ef_construction` - HNSW construction parameter (higher = better recall, slower build)
    pub fn new(dimension: usize, capacity: usize, m: usize, ef_construction: usize) -> Self {
        let index = Hnsw::<f32, DistCosine>::new(
            m,
            capacity.max(1),
            MAX_LAYER,
            ef_construction,
            DistCosine,
        );

        Self {
            index,
            dimension,
            count: 0,
        }
    }

    /// Insert a vector into the index
    pub fn insert(&mut self, id: usize, vector: &[f32]) -> Result<(), VectorIndexError> {
        self.check_dimension(vector)?;
        self.index.insert((vector, id));
        self.count += 1;
        Ok(())
    }

    /// Search for k nearest neighbors
    ///
    /// # Returns
    /// Results sorted by similarity descending
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchResult>, VectorIndexError> {
        self.check_dimension(query)?;

        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = self
            .index
            .search(query, k, ef_search.max(k))
            .into_iter()
            .map(|neighbour| SearchResult {
                id: neighbour.d_id,
                score: 1.0 - neighbour.distance, // Convert distance to similarity
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dimension: usize, hot: &[(usize, f32)]) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        for (i, value) in hot {
            v[*i] = *value;
        }
        v
    }

    #[test]
    fn test_index_creation() {
        let index = VectorIndex::new(8, 10, 16, 200);
        assert_eq!(index.dimension(), 8);
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let mut index = VectorIndex::new(8, 10, 16, 200);

        index.insert(0, &axis(8, &[(0, 1.0)])).unwrap();
        index.insert(1, &axis(8, &[(1, 1.0)])).unwrap();
        index.insert(2, &axis(8, &[(0, 0.9), (1, 0.1)])).unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search(&axis(8, &[(0, 1.0)]), 2, 50).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 0);
        assert_eq!(results[1].id, 2);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(8, 10, 16, 200);
        let results = index.search(&axis(8, &[(0, 1.0)]), 3, 50).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_dimension_validation() {
        let mut index = VectorIndex::new(8, 10, 16, 200);
        assert!(index.insert(1, &[1.0; 4]).is_err());
        assert!(index.search(&[1.0; 4], 1, 10).is_err());
    }
}
