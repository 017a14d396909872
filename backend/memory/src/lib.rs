pub mod compliance;
pub mod embeddings;
pub mod pinecone;
pub mod qa;
pub mod store;
pub mod types;

pub use compliance::{compliance_query, ComplianceAnalyzer};
pub use embeddings::{EmbeddingProvider, OpenAIEmbeddings};
pub use pinecone::PineconeIndex;
pub use qa::{RetrievalQa, RetrievalAnswer};
pub use store::{InMemoryVectorIndex, VectorIndex};
pub use types::{IndexMatch, KnowledgeEntry};
