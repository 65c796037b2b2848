//! Query-driven unit retrieval
//!
//! ```text
//! query ──► tokenize ──► LexicalIndex (BM25) ──► top_k × pool ──► SemanticRanker (optional)
//!                                                                        │
//!                        Retrieval ◄── ReferenceGraph::expand ◄── top_k seeds
//! ```
//!
//! The semantic stage is bounded by a deadline; any failure there degrades the
//! call to a lexical-only ranking instead of failing it.

mod error;
mod lexical;
pub mod openai;
mod retriever;
mod semantic;
mod tokenize;

pub use error::{Result, SearchError};
pub use lexical::{Bm25Config, LexicalIndex, Posting, ScoredUnit};
pub use openai::OpenAiEmbedder;
pub use retriever::{Retrieval, RetrievalMode, RetrievalParams, RetrievedUnit, Retriever};
pub use semantic::{Embedder, EmbeddingScorer, SemanticConfig, SemanticRanker, SimilarityScorer};
pub use tokenize::tokenize;
