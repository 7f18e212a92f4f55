/// Embedding & indexing for the built-in vector store
///
/// - EmbeddingProvider trait for abstraction
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - HNSW for vector similarity search
/// - MemoryVectorStore tying both to a pre-chunked corpus
mod provider;
mod store;
mod vector_index;

pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use store::{load_corpus, MemoryVectorStore, SIMILARITY_KEY};
pub use vector_index::{SearchResult, VectorIndex, VectorIndexError};
